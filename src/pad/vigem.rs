//! ViGEmBus backend (Windows only)
//!
//! Creates a wired Xbox 360 target on the ViGEmBus virtual gamepad bus
//! driver and mirrors staged mutations into an XUSB report. Rumble
//! notifications from consuming applications arrive on a dedicated thread
//! owned by `vigem-client`; they are handed to the registered feedback
//! callback untouched.
//!
//! Reference: https://github.com/nefarius/ViGEmBus

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::protocol::{StickSide, TriggerSide};

use super::{FeedbackCallback, PadButton, PadError, PadState, Vibration, VirtualPad};

/// Virtual X360 pad plugged into the ViGEmBus driver
pub struct VigemPad {
    target: vigem_client::Xbox360Wired<vigem_client::Client>,
    /// Staged XUSB report, submitted on commit
    report: vigem_client::XGamepad,
    feedback: Arc<Mutex<Option<FeedbackCallback>>>,
}

fn unavailable(err: vigem_client::Error) -> PadError {
    PadError::DeviceUnavailable(err.to_string())
}

fn io(err: vigem_client::Error) -> PadError {
    PadError::Io(err.to_string())
}

impl VigemPad {
    /// Connect to the bus, plug in a wired X360 target and start the
    /// notification thread.
    ///
    /// Fails with [`PadError::DeviceUnavailable`] when ViGEmBus is not
    /// installed.
    pub fn connect() -> Result<Self, PadError> {
        let client = vigem_client::Client::connect().map_err(unavailable)?;

        let mut target =
            vigem_client::Xbox360Wired::new(client, vigem_client::TargetId::XBOX360_WIRED);
        target.plugin().map_err(unavailable)?;
        target.wait_ready().map_err(unavailable)?;

        info!("🎮 ViGEm X360 target plugged in");

        let feedback: Arc<Mutex<Option<FeedbackCallback>>> = Arc::new(Mutex::new(None));
        let feedback_for_thread = feedback.clone();

        // The notification thread outlives individual sessions; it only
        // forwards into the registered callback and must never block.
        target
            .request_notification()
            .map_err(io)?
            .spawn_thread(move |_, notification| {
                let vibration = Vibration {
                    large_motor: notification.large_motor,
                    small_motor: notification.small_motor,
                };
                let callback = feedback_for_thread.lock().clone();
                if let Some(callback) = callback {
                    callback(vibration);
                } else {
                    debug!(?vibration, "rumble notification dropped (no subscriber yet)");
                }
            });

        Ok(Self {
            target,
            report: vigem_client::XGamepad::default(),
            feedback,
        })
    }

    /// Mirror of the staged report, for diagnostics
    pub fn staged_state(&self) -> PadState {
        PadState {
            buttons: self.report.buttons.raw,
            left_stick: (self.report.thumb_lx, self.report.thumb_ly),
            right_stick: (self.report.thumb_rx, self.report.thumb_ry),
            left_trigger: self.report.left_trigger,
            right_trigger: self.report.right_trigger,
            vibration: Vibration::default(),
        }
    }
}

impl VirtualPad for VigemPad {
    fn name(&self) -> &str {
        "vigem"
    }

    fn press(&mut self, button: PadButton) -> Result<(), PadError> {
        self.report.buttons.raw |= button.bit();
        Ok(())
    }

    fn release(&mut self, button: PadButton) -> Result<(), PadError> {
        self.report.buttons.raw &= !button.bit();
        Ok(())
    }

    fn stick(&mut self, side: StickSide, x: i16, y: i16) -> Result<(), PadError> {
        match side {
            StickSide::Left => {
                self.report.thumb_lx = x;
                self.report.thumb_ly = y;
            }
            StickSide::Right => {
                self.report.thumb_rx = x;
                self.report.thumb_ry = y;
            }
        }
        Ok(())
    }

    fn trigger(&mut self, side: TriggerSide, value: u8) -> Result<(), PadError> {
        match side {
            TriggerSide::Lt => self.report.left_trigger = value,
            TriggerSide::Rt => self.report.right_trigger = value,
        }
        Ok(())
    }

    fn vibration_intent(&mut self, vibration: Vibration) -> Result<(), PadError> {
        // A virtual pad's rumble is driven by the consuming game through the
        // notification path; a client-side intent has no XUSB field to land in.
        debug!(
            large = vibration.large_motor,
            small = vibration.small_motor,
            "client rumble intent has no effect on a ViGEm target"
        );
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PadError> {
        self.target.update(&self.report).map_err(io)
    }

    fn set_feedback_callback(&mut self, callback: FeedbackCallback) {
        *self.feedback.lock() = Some(callback);
    }
}

impl Drop for VigemPad {
    fn drop(&mut self) {
        if let Err(e) = self.target.unplug() {
            warn!("failed to unplug ViGEm target: {}", e);
        }
    }
}
