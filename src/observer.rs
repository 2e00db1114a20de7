// src/observer.rs - State-change notification sinks
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::cover::CoverSnapshot;

/// Called after every state mutation. Must not block.
pub trait StateObserver: Send + Sync {
    fn state_changed(&self, snapshot: &CoverSnapshot);
}

/// Bounded broadcast topic of snapshots. Lagging subscribers lose the oldest
/// updates rather than slowing the publisher.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<Arc<CoverSnapshot>>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<CoverSnapshot>> {
        self.tx.subscribe()
    }
}

impl StateObserver for BroadcastObserver {
    fn state_changed(&self, snapshot: &CoverSnapshot) {
        // No subscribers is fine.
        let _ = self.tx.send(Arc::new(snapshot.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::{MotionState, Polarity};

    #[tokio::test]
    async fn test_broadcast_observer_delivers_snapshots() {
        let observer = BroadcastObserver::new(8);
        let mut rx = observer.subscribe();
        let snapshot = CoverSnapshot::new("Bedroom", 40.0, MotionState::Closing, Polarity::ZeroOpen);
        observer.state_changed(&snapshot);
        let received = rx.recv().await.unwrap();
        assert_eq!(*received, snapshot);
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let observer = BroadcastObserver::new(1);
        observer.state_changed(&CoverSnapshot::new("x", 0.0, MotionState::Idle, Polarity::ZeroOpen));
    }
}
