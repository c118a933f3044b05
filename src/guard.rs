//! Device guard - the single serialization point for pad mutations
//!
//! The guard owns the one [`VirtualPad`] handle plus the authoritative
//! [`PadState`] mirror, both behind one mutex. `apply` holds the lock for
//! the whole mutate → commit span, so batches from different sessions never
//! interleave and no consumer of the virtual pad can observe a partial
//! batch. Nothing awaits while the lock is held; every backend call is a
//! short synchronous operation.

use parking_lot::Mutex;

use crate::pad::{FeedbackCallback, PadButton, PadError, PadMutation, PadState, Vibration, VirtualPad};
use crate::protocol::{StickSide, TriggerSide};

struct GuardInner {
    pad: Box<dyn VirtualPad>,
    state: PadState,
}

/// Exclusive wrapper around the process-wide virtual pad handle
pub struct PadGuard {
    inner: Mutex<GuardInner>,
}

impl PadGuard {
    pub fn new(pad: Box<dyn VirtualPad>) -> Self {
        Self {
            inner: Mutex::new(GuardInner {
                pad,
                state: PadState::neutral(),
            }),
        }
    }

    /// Backend name, for startup logging
    pub fn backend_name(&self) -> String {
        self.inner.lock().pad.name().to_string()
    }

    /// Apply one mutation batch and commit once.
    ///
    /// Concurrent callers queue on the lock; at most one batch is in flight
    /// system-wide. An empty batch is a no-op and is not committed. On device
    /// failure the mirror is left as-is (unspecified relative to the device);
    /// the caller reports the error and does not retry.
    pub fn apply(&self, batch: &[PadMutation]) -> Result<(), PadError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock();
        for mutation in batch {
            match *mutation {
                PadMutation::Press(button) => inner.pad.press(button)?,
                PadMutation::Release(button) => inner.pad.release(button)?,
                PadMutation::Stick { side, x, y } => inner.pad.stick(side, x, y)?,
                PadMutation::Trigger { side, value } => inner.pad.trigger(side, value)?,
                PadMutation::Vibration(v) => inner.pad.vibration_intent(v)?,
            }
            inner.state.apply(mutation);
        }
        inner.pad.commit()
    }

    /// Release everything, center sticks, zero triggers and rumble intent,
    /// single commit. Used at startup and by the `/reset` endpoint.
    pub fn reset(&self) -> Result<(), PadError> {
        self.apply(&reset_batch())
    }

    /// Copy of the authoritative state mirror
    pub fn snapshot(&self) -> PadState {
        self.inner.lock().state
    }

    /// Forward the feedback callback registration to the backend
    pub fn set_feedback_callback(&self, callback: FeedbackCallback) {
        self.inner.lock().pad.set_feedback_callback(callback);
    }
}

/// The full neutral-state batch used by [`PadGuard::reset`]
pub fn reset_batch() -> Vec<PadMutation> {
    let mut batch: Vec<PadMutation> = PadButton::ALL
        .iter()
        .map(|&button| PadMutation::Release(button))
        .collect();
    batch.push(PadMutation::Stick {
        side: StickSide::Left,
        x: 0,
        y: 0,
    });
    batch.push(PadMutation::Stick {
        side: StickSide::Right,
        x: 0,
        y: 0,
    });
    batch.push(PadMutation::Trigger {
        side: TriggerSide::Lt,
        value: 0,
    });
    batch.push(PadMutation::Trigger {
        side: TriggerSide::Rt,
        value: 0,
    });
    batch.push(PadMutation::Vibration(Vibration::default()));
    batch
}
