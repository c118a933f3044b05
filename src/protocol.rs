//! Wire protocol for the WebSocket endpoint
//!
//! Inbound messages are plain JSON objects without a type tag; the shape is
//! recognized by its fields (`ping`, `button`+`action`, `stick`+`x`+`y`, ...).
//! Decoding goes through an untagged enum so the first matching shape wins and
//! unknown extra fields are ignored. Numeric fields are decoded wide (`i64`)
//! and clamped later by the mapper, so an out-of-range `x` clamps instead of
//! being rejected as a different shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pad::Vibration;

/// Button action on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonAction {
    Press,
    Release,
}

/// Which analog stick a message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StickSide {
    Left,
    Right,
}

/// Which trigger a message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSide {
    Lt,
    Rt,
}

/// Vibration intent from a client (client → device direction)
///
/// Values are decoded wide and clamped to u8 by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct VibrationIntent {
    pub large_motor: i64,
    pub small_motor: i64,
}

/// One decoded inbound message
///
/// Variant order is the shape-matching priority: `ping` is checked first so a
/// keepalive can never be misread as a controller event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// `{"ping": true}` — presence of the field is what matters, as in the
    /// legacy protocol.
    Ping { ping: serde_json::Value },
    /// `{"button": "a", "action": "press"}`
    Button { button: String, action: ButtonAction },
    /// `{"stick": "left", "x": 0, "y": 0}`
    Stick { stick: StickSide, x: i64, y: i64 },
    /// `{"trigger": "lt", "value": 255}`
    Trigger { trigger: TriggerSide, value: i64 },
    /// `{"vibration": {"large_motor": 255, "small_motor": 0}}`
    Vibration { vibration: VibrationIntent },
}

/// Decode failure, scoped to a single message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("Invalid message format")]
    InvalidShape,
}

/// Decode one text frame into a [`ClientMessage`].
///
/// Distinguishes malformed JSON from a well-formed object that matches no
/// known shape; both leave the connection open, but the client gets a
/// different error message.
pub fn decode(text: &str) -> Result<ClientMessage, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;
    serde_json::from_value(value).map_err(|_| ProtocolError::InvalidShape)
}

/// Per-message reply sent back on the same connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    Pong,
    Success,
    Error { message: String },
}

impl Reply {
    /// Build an error reply from any displayable error
    pub fn error(err: impl std::fmt::Display) -> Self {
        Reply::Error {
            message: err.to_string(),
        }
    }
}

/// Asynchronous server → client frame carrying a vibration notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibrationFrame {
    pub vibration: Vibration,
}
