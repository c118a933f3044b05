//! Virtual controller backends
//!
//! The gateway talks to exactly one virtual Xbox 360 pad through the
//! [`VirtualPad`] trait. Mutations are staged field by field and become
//! visible to the OS only on [`VirtualPad::commit`], so a batch from one
//! message never leaves a partially applied report behind.
//!
//! Backends:
//! - `console`: logs every mutation, tracks a state mirror. Default on
//!   non-Windows hosts and in tests.
//! - `vigem` (Windows): drives a ViGEmBus X360 target via `vigem-client`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{StickSide, TriggerSide};

pub mod console;
#[cfg(windows)]
pub mod vigem;

pub use console::ConsolePad;
#[cfg(windows)]
pub use vigem::VigemPad;

/// One physical button on the pad
///
/// D-pad directions and stick clicks share the namespace with face buttons;
/// they are all plain bits in the XUSB report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadButton {
    A,
    B,
    X,
    Y,
    Lb,
    Rb,
    Start,
    Back,
    Home,
    DpadUp,
    DpadRight,
    DpadDown,
    DpadLeft,
    ThumbL,
    ThumbR,
}

impl PadButton {
    /// All buttons, used by the reset batch
    pub const ALL: [PadButton; 15] = [
        PadButton::A,
        PadButton::B,
        PadButton::X,
        PadButton::Y,
        PadButton::Lb,
        PadButton::Rb,
        PadButton::Start,
        PadButton::Back,
        PadButton::Home,
        PadButton::DpadUp,
        PadButton::DpadRight,
        PadButton::DpadDown,
        PadButton::DpadLeft,
        PadButton::ThumbL,
        PadButton::ThumbR,
    ];

    /// XUSB report bit for this button
    pub const fn bit(self) -> u16 {
        match self {
            PadButton::DpadUp => 0x0001,
            PadButton::DpadDown => 0x0002,
            PadButton::DpadLeft => 0x0004,
            PadButton::DpadRight => 0x0008,
            PadButton::Start => 0x0010,
            PadButton::Back => 0x0020,
            PadButton::ThumbL => 0x0040,
            PadButton::ThumbR => 0x0080,
            PadButton::Lb => 0x0100,
            PadButton::Rb => 0x0200,
            PadButton::Home => 0x0400,
            PadButton::A => 0x1000,
            PadButton::B => 0x2000,
            PadButton::X => 0x4000,
            PadButton::Y => 0x8000,
        }
    }

    /// Resolve a wire button name. `select` is accepted as an alias of
    /// `back`. Returns `None` for names outside the canonical set (`lt`/`rt`
    /// are not buttons; the mapper turns them into trigger mutations).
    pub fn from_wire(name: &str) -> Option<Self> {
        Some(match name {
            "a" => PadButton::A,
            "b" => PadButton::B,
            "x" => PadButton::X,
            "y" => PadButton::Y,
            "lb" => PadButton::Lb,
            "rb" => PadButton::Rb,
            "start" => PadButton::Start,
            "back" | "select" => PadButton::Back,
            "home" => PadButton::Home,
            "up" => PadButton::DpadUp,
            "right" => PadButton::DpadRight,
            "down" => PadButton::DpadDown,
            "left" => PadButton::DpadLeft,
            "ls" => PadButton::ThumbL,
            "rs" => PadButton::ThumbR,
            _ => return None,
        })
    }

    /// Canonical wire name (aliases are not round-tripped)
    pub fn wire_name(self) -> &'static str {
        match self {
            PadButton::A => "a",
            PadButton::B => "b",
            PadButton::X => "x",
            PadButton::Y => "y",
            PadButton::Lb => "lb",
            PadButton::Rb => "rb",
            PadButton::Start => "start",
            PadButton::Back => "back",
            PadButton::Home => "home",
            PadButton::DpadUp => "up",
            PadButton::DpadRight => "right",
            PadButton::DpadDown => "down",
            PadButton::DpadLeft => "left",
            PadButton::ThumbL => "ls",
            PadButton::ThumbR => "rs",
        }
    }
}

/// Rumble motor values, both directions (device notification and client
/// intent after clamping)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vibration {
    pub large_motor: u8,
    pub small_motor: u8,
}

/// One staged device mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadMutation {
    Press(PadButton),
    Release(PadButton),
    Stick { side: StickSide, x: i16, y: i16 },
    Trigger { side: TriggerSide, value: u8 },
    Vibration(Vibration),
}

/// Mirror of the virtual pad's report
///
/// The authoritative instance lives inside the device guard and is only
/// mutated under its lock; backends may keep their own copy for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PadState {
    /// XUSB button bitmask
    pub buttons: u16,
    pub left_stick: (i16, i16),
    pub right_stick: (i16, i16),
    pub left_trigger: u8,
    pub right_trigger: u8,
    /// Last client-requested rumble intent
    pub vibration: Vibration,
}

impl PadState {
    /// All-neutral state (everything released, centered, zeroed)
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, button: PadButton) -> bool {
        self.buttons & button.bit() != 0
    }

    /// Fold one mutation into the mirror
    pub fn apply(&mut self, mutation: &PadMutation) {
        match *mutation {
            PadMutation::Press(button) => self.buttons |= button.bit(),
            PadMutation::Release(button) => self.buttons &= !button.bit(),
            PadMutation::Stick {
                side: StickSide::Left,
                x,
                y,
            } => self.left_stick = (x, y),
            PadMutation::Stick {
                side: StickSide::Right,
                x,
                y,
            } => self.right_stick = (x, y),
            PadMutation::Trigger {
                side: TriggerSide::Lt,
                value,
            } => self.left_trigger = value,
            PadMutation::Trigger {
                side: TriggerSide::Rt,
                value,
            } => self.right_trigger = value,
            PadMutation::Vibration(v) => self.vibration = v,
        }
    }
}

/// Device-level failure
#[derive(Debug, Clone, Error)]
pub enum PadError {
    /// The virtual controller bus is not installed or the target vanished
    #[error("virtual controller unavailable: {0}")]
    DeviceUnavailable(String),
    /// The device rejected a report
    #[error("virtual controller error: {0}")]
    Io(String),
}

/// Callback invoked with device-originated vibration feedback.
///
/// Runs on the backend's notification thread, outside the tokio runtime;
/// implementations must only hand the value off, never block.
pub type FeedbackCallback = Arc<dyn Fn(Vibration) + Send + Sync>;

/// The single virtual controller handle
///
/// All methods take `&mut self`; exclusivity across sessions is enforced one
/// level up by the device guard. Mutations stage changes in the backend's
/// report and `commit` makes them visible atomically.
pub trait VirtualPad: Send {
    /// Backend name for logs ("console", "vigem")
    fn name(&self) -> &str;

    fn press(&mut self, button: PadButton) -> Result<(), PadError>;

    fn release(&mut self, button: PadButton) -> Result<(), PadError>;

    fn stick(&mut self, side: StickSide, x: i16, y: i16) -> Result<(), PadError>;

    fn trigger(&mut self, side: TriggerSide, value: u8) -> Result<(), PadError>;

    /// Record a client-requested rumble intent. Backends that cannot express
    /// this on the device are free to just log it.
    fn vibration_intent(&mut self, vibration: Vibration) -> Result<(), PadError>;

    /// Make all staged mutations visible to consumers of the virtual pad
    fn commit(&mut self) -> Result<(), PadError>;

    /// Register the (single) feedback callback for device-originated
    /// vibration events. Later registrations replace the callback; the
    /// fan-out bridge guarantees it only registers once.
    fn set_feedback_callback(&mut self, callback: FeedbackCallback);
}
