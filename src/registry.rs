//! Connection registry - the set of live client sessions
//!
//! Each session registers an unbounded sender on accept and is removed by
//! its own loop on close. Broadcast snapshots the current senders under the
//! lock, releases it, then delivers to the snapshot, so a slow or dead
//! connection can never stall the registry or the other deliveries. A failed
//! delivery is logged and left alone; the owning session unregisters itself
//! when its transport dies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::pad::Vibration;

/// Process-unique id for one client connection
pub type ConnId = u64;

/// Device-originated event fanned out to every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadEvent {
    Vibration(Vibration),
}

pub struct ConnectionRegistry {
    next_id: AtomicU64,
    sessions: Mutex<HashMap<ConnId, mpsc::UnboundedSender<PadEvent>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Add a session; returns its id and the receiving half for its loop
    pub fn register(&self) -> (ConnId, mpsc::UnboundedReceiver<PadEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.lock().insert(id, tx);
        debug!(conn = id, "session registered");
        (id, rx)
    }

    /// Remove a session. Safe to call while a broadcast to the same session
    /// is in flight; the stale sender in the snapshot just fails and is
    /// ignored. Returns false if the id was already gone.
    pub fn unregister(&self, id: ConnId) -> bool {
        let removed = self.sessions.lock().remove(&id).is_some();
        if removed {
            debug!(conn = id, "session unregistered");
        }
        removed
    }

    /// Deliver one event to every registered session, best-effort.
    ///
    /// Returns the number of successful deliveries.
    pub fn broadcast(&self, event: PadEvent) -> usize {
        let snapshot: Vec<(ConnId, mpsc::UnboundedSender<PadEvent>)> = {
            let sessions = self.sessions.lock();
            sessions.iter().map(|(&id, tx)| (id, tx.clone())).collect()
        };

        let mut delivered = 0;
        for (id, tx) in snapshot {
            if tx.send(event).is_ok() {
                delivered += 1;
            } else {
                // Session is tearing down; its loop owns the cleanup.
                debug!(conn = id, "broadcast delivery failed (session closing)");
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vibration(large: u8) -> PadEvent {
        PadEvent::Vibration(Vibration {
            large_motor: large,
            small_motor: 0,
        })
    }

    #[tokio::test]
    async fn broadcast_reaches_all_registered_sessions() {
        let registry = ConnectionRegistry::new();
        let (_id1, mut rx1) = registry.register();
        let (_id2, mut rx2) = registry.register();
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.broadcast(vibration(10)), 2);
        assert_eq!(rx1.recv().await, Some(vibration(10)));
        assert_eq!(rx2.recv().await, Some(vibration(10)));
    }

    #[tokio::test]
    async fn broken_session_does_not_block_the_others() {
        let registry = ConnectionRegistry::new();
        let (_id1, mut rx1) = registry.register();
        let (_id2, rx2) = registry.register();
        let (_id3, mut rx3) = registry.register();

        // Simulate a dead connection: receiver dropped but still registered
        drop(rx2);

        assert_eq!(registry.broadcast(vibration(42)), 2);
        assert_eq!(rx1.recv().await, Some(vibration(42)));
        assert_eq!(rx3.recv().await, Some(vibration(42)));
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (id, _rx) = registry.register();

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());

        // Broadcasting into an empty registry is a no-op
        assert_eq!(registry.broadcast(vibration(1)), 0);
    }

    #[tokio::test]
    async fn unregister_during_broadcast_is_a_noop_for_that_session() {
        let registry = ConnectionRegistry::new();
        let (id1, rx1) = registry.register();
        let (_id2, mut rx2) = registry.register();

        // Teardown racing the broadcast: session 1 drops its receiver and
        // unregisters; the broadcast must still reach session 2 cleanly.
        drop(rx1);
        registry.unregister(id1);

        assert_eq!(registry.broadcast(vibration(7)), 1);
        assert_eq!(rx2.recv().await, Some(vibration(7)));
    }
}
