//! Event fan-out bridge - device feedback into the session world
//!
//! The backend's rumble notifications arrive on a thread owned by the
//! driver, outside the tokio runtime. The bridge registers a callback that
//! only pushes the value into an unbounded channel (never blocks, never
//! touches the device lock) and spawns one task that drains the channel and
//! broadcasts through the connection registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::guard::PadGuard;
use crate::registry::{ConnectionRegistry, PadEvent};

pub struct FeedbackBridge {
    registry: Arc<ConnectionRegistry>,
    subscribed: AtomicBool,
}

impl FeedbackBridge {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            subscribed: AtomicBool::new(false),
        }
    }

    /// Register the feedback callback on the pad and start the forwarding
    /// task. Idempotent: the first call wins, later calls are no-ops and
    /// return false.
    ///
    /// Must run inside the tokio runtime (spawns the drain task).
    pub fn subscribe(&self, guard: &PadGuard) -> bool {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            debug!("feedback bridge already subscribed, ignoring");
            return false;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();

        // Driver-thread side: hand off and return immediately.
        guard.set_feedback_callback(Arc::new(move |vibration| {
            let _ = tx.send(vibration);
        }));

        let registry = self.registry.clone();
        tokio::spawn(async move {
            while let Some(vibration) = rx.recv().await {
                let delivered = registry.broadcast(PadEvent::Vibration(vibration));
                debug!(
                    large = vibration.large_motor,
                    small = vibration.small_motor,
                    delivered,
                    "vibration feedback fanned out"
                );
            }
            debug!("feedback channel closed, fan-out task exiting");
        });

        info!("feedback bridge subscribed to pad notifications");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pad::{ConsolePad, Vibration};

    #[tokio::test]
    async fn feedback_is_fanned_out_to_registered_sessions() {
        let pad = ConsolePad::new();
        let handle = pad.feedback_handle();
        let guard = PadGuard::new(Box::new(pad));

        let registry = Arc::new(ConnectionRegistry::new());
        let (_id1, mut rx1) = registry.register();
        let (_id2, mut rx2) = registry.register();

        let bridge = FeedbackBridge::new(registry.clone());
        assert!(bridge.subscribe(&guard));

        let vibration = Vibration {
            large_motor: 180,
            small_motor: 20,
        };
        handle.emit(vibration);

        assert_eq!(rx1.recv().await, Some(PadEvent::Vibration(vibration)));
        assert_eq!(rx2.recv().await, Some(PadEvent::Vibration(vibration)));
    }

    #[tokio::test]
    async fn second_subscribe_is_a_noop() {
        let pad = ConsolePad::new();
        let guard = PadGuard::new(Box::new(pad));
        let registry = Arc::new(ConnectionRegistry::new());

        let bridge = FeedbackBridge::new(registry);
        assert!(bridge.subscribe(&guard));
        assert!(!bridge.subscribe(&guard));
    }
}
