//! Console backend - logs all pad mutations for testing and debugging

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::protocol::{StickSide, TriggerSide};

use super::{FeedbackCallback, PadButton, PadError, PadMutation, PadState, Vibration, VirtualPad};

/// ConsolePad logs every mutation and commit instead of driving a device
///
/// This is useful for:
/// - Running the gateway on hosts without ViGEmBus (Linux, macOS, CI)
/// - Validating client mappings without a game attached
/// - Tests that need to inject device-originated feedback
pub struct ConsolePad {
    /// Local mirror of the staged report, printed on commit
    state: PadState,
    /// Commits since startup, for log correlation
    commit_count: u64,
    feedback: Arc<Mutex<Option<FeedbackCallback>>>,
}

/// Test/diagnostic handle that can fire the registered feedback callback as
/// if the driver had sent a rumble notification
#[derive(Clone)]
pub struct FeedbackHandle {
    slot: Arc<Mutex<Option<FeedbackCallback>>>,
}

impl FeedbackHandle {
    /// Invoke the registered callback, if any. Safe to call from any thread.
    pub fn emit(&self, vibration: Vibration) {
        let callback = self.slot.lock().clone();
        if let Some(callback) = callback {
            callback(vibration);
        }
    }
}

impl ConsolePad {
    pub fn new() -> Self {
        info!("🎮 Console pad backend active (no virtual device will be created)");
        Self {
            state: PadState::neutral(),
            commit_count: 0,
            feedback: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for injecting synthetic feedback; grab it before boxing the pad
    pub fn feedback_handle(&self) -> FeedbackHandle {
        FeedbackHandle {
            slot: self.feedback.clone(),
        }
    }

    /// Current staged state (committed or not)
    pub fn state(&self) -> PadState {
        self.state
    }
}

impl Default for ConsolePad {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualPad for ConsolePad {
    fn name(&self) -> &str {
        "console"
    }

    fn press(&mut self, button: PadButton) -> Result<(), PadError> {
        debug!(button = button.wire_name(), "press");
        self.state.apply(&PadMutation::Press(button));
        Ok(())
    }

    fn release(&mut self, button: PadButton) -> Result<(), PadError> {
        debug!(button = button.wire_name(), "release");
        self.state.apply(&PadMutation::Release(button));
        Ok(())
    }

    fn stick(&mut self, side: StickSide, x: i16, y: i16) -> Result<(), PadError> {
        debug!(?side, x, y, "stick");
        self.state.apply(&PadMutation::Stick { side, x, y });
        Ok(())
    }

    fn trigger(&mut self, side: TriggerSide, value: u8) -> Result<(), PadError> {
        debug!(?side, value, "trigger");
        self.state.apply(&PadMutation::Trigger { side, value });
        Ok(())
    }

    fn vibration_intent(&mut self, vibration: Vibration) -> Result<(), PadError> {
        debug!(
            large = vibration.large_motor,
            small = vibration.small_motor,
            "vibration intent"
        );
        self.state.apply(&PadMutation::Vibration(vibration));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PadError> {
        self.commit_count += 1;
        debug!(
            commit = self.commit_count,
            "commit: buttons={:#06x} ls={:?} rs={:?} lt={} rt={}",
            self.state.buttons,
            self.state.left_stick,
            self.state.right_stick,
            self.state.left_trigger,
            self.state.right_trigger
        );
        Ok(())
    }

    fn set_feedback_callback(&mut self, callback: FeedbackCallback) {
        *self.feedback.lock() = Some(callback);
    }
}
