//! Input mapper - pure translation from decoded messages to pad mutations
//!
//! No I/O, no locking. Given one [`ClientMessage`] the mapper produces the
//! complete mutation batch for that message; the device guard applies the
//! batch and commits once.
//!
//! Policies:
//! - Button names resolve through the fixed table in [`PadButton::from_wire`];
//!   unknown names are rejected and produce no mutations.
//! - `lt`/`rt` arriving as button+action are legacy shorthand for trigger
//!   value 255 (press) / 0 (release).
//! - Stick Y is sign-flipped before clamping when `invert_y` is set (wire
//!   convention: positive Y is up; XUSB convention: positive Y is down).
//!   Flipping happens on the wide value so `y = -32768` clamps to 32767
//!   instead of overflowing.
//! - Every numeric field is clamped to its device range; range errors do not
//!   exist on this path by construction.

use thiserror::Error;

use crate::pad::{PadButton, PadMutation, Vibration};
use crate::protocol::{ButtonAction, ClientMessage, TriggerSide};

/// Validation failure inside the mapper; reported to the sending client,
/// never touches the device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("Invalid button: {0}")]
    InvalidButton(String),
    #[error("Vibration intent disabled")]
    VibrationDisabled,
}

/// Mapping conventions, fixed at startup from config
#[derive(Debug, Clone, Copy)]
pub struct MapperSettings {
    /// Flip the Y sign on stick updates (wire up-positive → device
    /// down-positive). One process-wide convention, never inferred per
    /// message.
    pub invert_y: bool,
    /// Accept the optional client → device vibration-set shape
    pub allow_vibration_intent: bool,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            invert_y: true,
            allow_vibration_intent: true,
        }
    }
}

fn clamp_axis(value: i64) -> i16 {
    value.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

fn clamp_motor(value: i64) -> u8 {
    value.clamp(0, u8::MAX as i64) as u8
}

/// Translate one message into its mutation batch.
///
/// `Ping` is answered upstream by the session handler and maps to an empty
/// batch here; an empty batch is never committed.
pub fn map_message(
    message: &ClientMessage,
    settings: &MapperSettings,
) -> Result<Vec<PadMutation>, MapError> {
    match message {
        ClientMessage::Ping { .. } => Ok(Vec::new()),

        ClientMessage::Button { button, action } => {
            // Legacy trigger-as-button form
            if let Some(side) = trigger_side_for_name(button) {
                let value = match action {
                    ButtonAction::Press => u8::MAX,
                    ButtonAction::Release => 0,
                };
                return Ok(vec![PadMutation::Trigger { side, value }]);
            }

            let pad_button = PadButton::from_wire(button)
                .ok_or_else(|| MapError::InvalidButton(button.clone()))?;
            Ok(vec![match action {
                ButtonAction::Press => PadMutation::Press(pad_button),
                ButtonAction::Release => PadMutation::Release(pad_button),
            }])
        }

        ClientMessage::Stick { stick, x, y } => {
            let y = if settings.invert_y { -*y } else { *y };
            Ok(vec![PadMutation::Stick {
                side: *stick,
                x: clamp_axis(*x),
                y: clamp_axis(y),
            }])
        }

        ClientMessage::Trigger { trigger, value } => Ok(vec![PadMutation::Trigger {
            side: *trigger,
            value: clamp_motor(*value),
        }]),

        ClientMessage::Vibration { vibration } => {
            if !settings.allow_vibration_intent {
                return Err(MapError::VibrationDisabled);
            }
            Ok(vec![PadMutation::Vibration(Vibration {
                large_motor: clamp_motor(vibration.large_motor),
                small_motor: clamp_motor(vibration.small_motor),
            })])
        }
    }
}

fn trigger_side_for_name(name: &str) -> Option<TriggerSide> {
    match name {
        "lt" => Some(TriggerSide::Lt),
        "rt" => Some(TriggerSide::Rt),
        _ => None,
    }
}
