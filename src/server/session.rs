//! Per-connection session loop
//!
//! Lifecycle: accept → register in the connection registry → serve → on
//! transport close or error, unregister and drop. While serving, each
//! inbound message is decoded, dispatched and answered before the next one
//! is read; different connections interleave freely, a single connection
//! never pipelines.
//!
//! Every per-message failure (bad JSON, unknown shape, invalid button,
//! device error) is reported to the sending client and the loop keeps
//! going; only transport failures end the session.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tracing::{debug, info, warn};

use crate::mapper;
use crate::protocol::{self, ClientMessage, Reply, VibrationFrame};
use crate::registry::PadEvent;

use super::ServerState;

pub async fn run_session(mut socket: WebSocket, addr: SocketAddr, state: Arc<ServerState>) {
    let (conn_id, mut events) = state.registry.register();
    info!(conn = conn_id, %addr, "WebSocket session accepted");

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let reply = process_text(&text, &state);
                        let json = match serde_json::to_string(&reply) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(conn = conn_id, "failed to serialize reply: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json)).await.is_err() {
                            warn!(conn = conn_id, "reply send failed, closing session");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(conn = conn_id, "client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary and pong frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        warn!(conn = conn_id, "WebSocket error: {}", e);
                        break;
                    }
                }
            }

            event = events.recv() => {
                match event {
                    Some(PadEvent::Vibration(vibration)) => {
                        let frame = VibrationFrame { vibration };
                        let json = match serde_json::to_string(&frame) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(conn = conn_id, "failed to serialize notification: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json)).await.is_err() {
                            warn!(conn = conn_id, "notification send failed, closing session");
                            break;
                        }
                    }
                    None => {
                        // Registry side dropped the sender; session is done
                        break;
                    }
                }
            }
        }
    }

    state.registry.unregister(conn_id);
    info!(conn = conn_id, "WebSocket session closed");
}

/// Decode, dispatch and build the reply for one text frame.
///
/// Holds the device lock only inside `guard.apply`; all failures collapse to
/// an error reply scoped to this message.
pub fn process_text(text: &str, state: &ServerState) -> Reply {
    let message = match protocol::decode(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("rejected inbound frame: {}", e);
            return Reply::error(e);
        }
    };

    if matches!(message, ClientMessage::Ping { .. }) {
        return Reply::Pong;
    }

    let batch = match mapper::map_message(&message, &state.settings) {
        Ok(batch) => batch,
        Err(e) => {
            debug!("mapper rejected message: {}", e);
            return Reply::error(e);
        }
    };

    match state.guard.apply(&batch) {
        Ok(()) => Reply::Success,
        Err(e) => {
            warn!("device apply failed: {}", e);
            Reply::error(e)
        }
    }
}
