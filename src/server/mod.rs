//! HTTP and WebSocket surface
//!
//! Endpoints:
//! - `GET /` — informational banner
//! - `GET /ping` — liveness probe
//! - `GET /reset` — return the pad to neutral
//! - `GET /ws` — the input protocol (see [`crate::protocol`])
//!
//! A configured web directory is served as a fallback so the PWA frontend
//! can be hosted from the same port. CORS is wide open: the expected client
//! is a phone browser on the LAN, not a same-origin app.

pub mod session;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::guard::PadGuard;
use crate::mapper::MapperSettings;
use crate::registry::ConnectionRegistry;

/// Shared state for all handlers
pub struct ServerState {
    pub guard: Arc<PadGuard>,
    pub registry: Arc<ConnectionRegistry>,
    pub settings: MapperSettings,
}

/// Build the application router
pub fn build_router(state: Arc<ServerState>, web_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/", get(root_info))
        .route("/ping", get(liveness))
        .route("/reset", get(reset_pad))
        .route("/ws", get(ws_upgrade))
        .with_state(state);

    if let Some(dir) = web_dir {
        info!("Serving web frontend from {}", dir.display());
        router = router
            .fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router.layer(CorsLayer::permissive())
}

/// GET / - informational banner
async fn root_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "WebPad gateway is running"
    }))
}

/// GET /ping - liveness probe for clients checking reachability
async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "online" }))
}

/// GET /reset - release everything and recenter, on demand
async fn reset_pad(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
    match state.guard.reset() {
        Ok(()) => Json(serde_json::json!({
            "status": "success",
            "message": "Controller reset"
        })),
        Err(e) => {
            error!("Reset failed: {}", e);
            Json(serde_json::json!({
                "status": "error",
                "message": e.to_string()
            }))
        }
    }
}

/// GET /ws - upgrade to the input protocol
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::run_session(socket, addr, state))
}

/// Bind and serve until ctrl-c
pub async fn start_server(
    state: Arc<ServerState>,
    addr: SocketAddr,
    web_dir: Option<&Path>,
) -> Result<()> {
    let router = build_router(state, web_dir);

    info!("Starting gateway server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind gateway server")?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Shutdown signal received, stopping server");
    })
    .await
    .context("Gateway server error")?;

    Ok(())
}
