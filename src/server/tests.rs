//! End-to-end tests for the gateway server
//!
//! Spin up the real axum app on an ephemeral port and talk to it with a
//! plain WebSocket client, sharing the server state handle so device effects
//! can be asserted directly.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::feedback::FeedbackBridge;
use crate::guard::PadGuard;
use crate::mapper::MapperSettings;
use crate::pad::{console::FeedbackHandle, ConsolePad, PadButton, Vibration};
use crate::registry::ConnectionRegistry;

use super::{build_router, ServerState};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> (SocketAddr, Arc<ServerState>, FeedbackHandle) {
    let pad = ConsolePad::new();
    let feedback = pad.feedback_handle();
    let guard = Arc::new(PadGuard::new(Box::new(pad)));
    let registry = Arc::new(ConnectionRegistry::new());

    let state = Arc::new(ServerState {
        guard,
        registry: registry.clone(),
        settings: MapperSettings::default(),
    });

    let bridge = FeedbackBridge::new(registry);
    assert!(bridge.subscribe(&state.guard));

    let router = build_router(state.clone(), None);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (addr, state, feedback)
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (client, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("Failed to connect");
    client
}

async fn send_text(client: &mut WsClient, text: &str) {
    client
        .send(WsMessage::Text(text.to_string()))
        .await
        .expect("Failed to send message");
}

async fn recv_text(client: &mut WsClient) -> String {
    loop {
        match client.next().await.expect("connection closed").unwrap() {
            WsMessage::Text(text) => return text,
            // Transport-level frames are not part of the protocol
            _ => continue,
        }
    }
}

#[tokio::test]
async fn button_press_and_release_round_trip() {
    let (addr, state, _feedback) = spawn_server().await;
    let mut client = connect(addr).await;

    send_text(&mut client, r#"{"button":"a","action":"press"}"#).await;
    assert_eq!(recv_text(&mut client).await, r#"{"status":"success"}"#);
    assert!(state.guard.snapshot().is_pressed(PadButton::A));

    send_text(&mut client, r#"{"button":"a","action":"release"}"#).await;
    assert_eq!(recv_text(&mut client).await, r#"{"status":"success"}"#);
    assert!(!state.guard.snapshot().is_pressed(PadButton::A));
}

#[tokio::test]
async fn ping_gets_pong_without_device_interaction() {
    let (addr, state, _feedback) = spawn_server().await;
    let mut client = connect(addr).await;

    let before = state.guard.snapshot();
    send_text(&mut client, r#"{"ping": true}"#).await;
    assert_eq!(recv_text(&mut client).await, r#"{"status":"pong"}"#);
    assert_eq!(state.guard.snapshot(), before);
}

#[tokio::test]
async fn malformed_text_keeps_the_connection_usable() {
    let (addr, state, _feedback) = spawn_server().await;
    let mut client = connect(addr).await;

    send_text(&mut client, "not-json").await;
    assert_eq!(
        recv_text(&mut client).await,
        r#"{"status":"error","message":"Invalid JSON"}"#
    );

    // The same connection accepts a valid message afterwards
    send_text(&mut client, r#"{"button":"x","action":"press"}"#).await;
    assert_eq!(recv_text(&mut client).await, r#"{"status":"success"}"#);
    assert!(state.guard.snapshot().is_pressed(PadButton::X));
}

#[tokio::test]
async fn unknown_shape_and_unknown_button_are_reported() {
    let (addr, _state, _feedback) = spawn_server().await;
    let mut client = connect(addr).await;

    send_text(&mut client, r#"{"volume": 11}"#).await;
    assert_eq!(
        recv_text(&mut client).await,
        r#"{"status":"error","message":"Invalid message format"}"#
    );

    send_text(&mut client, r#"{"button":"turbo","action":"press"}"#).await;
    assert_eq!(
        recv_text(&mut client).await,
        r#"{"status":"error","message":"Invalid button: turbo"}"#
    );
}

#[tokio::test]
async fn vibration_feedback_reaches_every_client() {
    let (addr, _state, feedback) = spawn_server().await;
    let mut client1 = connect(addr).await;
    let mut client2 = connect(addr).await;

    // Register both sessions before firing the notification: each client
    // sends a ping and waits for the pong so the upgrade has completed.
    send_text(&mut client1, r#"{"ping": true}"#).await;
    recv_text(&mut client1).await;
    send_text(&mut client2, r#"{"ping": true}"#).await;
    recv_text(&mut client2).await;

    feedback.emit(Vibration {
        large_motor: 200,
        small_motor: 55,
    });

    let expected = r#"{"vibration":{"large_motor":200,"small_motor":55}}"#;
    assert_eq!(recv_text(&mut client1).await, expected);
    assert_eq!(recv_text(&mut client2).await, expected);
}

#[tokio::test]
async fn dropped_client_does_not_break_fan_out_to_the_rest() {
    let (addr, _state, feedback) = spawn_server().await;
    let mut client1 = connect(addr).await;
    let mut client2 = connect(addr).await;

    send_text(&mut client1, r#"{"ping": true}"#).await;
    recv_text(&mut client1).await;
    send_text(&mut client2, r#"{"ping": true}"#).await;
    recv_text(&mut client2).await;

    // Tear down client1 without a close handshake
    drop(client1);

    feedback.emit(Vibration {
        large_motor: 10,
        small_motor: 10,
    });
    assert_eq!(
        recv_text(&mut client2).await,
        r#"{"vibration":{"large_motor":10,"small_motor":10}}"#
    );
}

#[tokio::test]
async fn sessions_are_unregistered_on_disconnect() {
    let (addr, state, _feedback) = spawn_server().await;

    let mut client = connect(addr).await;
    send_text(&mut client, r#"{"ping": true}"#).await;
    recv_text(&mut client).await;
    assert_eq!(state.registry.len(), 1);

    client.close(None).await.unwrap();

    // Give the session loop a moment to observe the close
    for _ in 0..50 {
        if state.registry.is_empty() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("session was never unregistered");
}

#[tokio::test]
async fn http_liveness_and_reset_endpoints() {
    let (_addr, state, _feedback) = spawn_server().await;

    let body = super::liveness().await.0;
    assert_eq!(body["status"], "online");

    let body = super::root_info().await.0;
    assert!(body["message"].as_str().unwrap().contains("running"));

    // Dirty the pad, then reset through the handler
    state
        .guard
        .apply(&[crate::pad::PadMutation::Press(PadButton::B)])
        .unwrap();
    assert!(state.guard.snapshot().is_pressed(PadButton::B));

    let body = super::reset_pad(State(state.clone())).await.0;
    assert_eq!(body["status"], "success");
    assert_eq!(state.guard.snapshot(), crate::pad::PadState::neutral());
}
