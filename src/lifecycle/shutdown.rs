//! Shutdown coordination for the agent.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

/// Coordinator for graceful shutdown.
///
/// Long-running tasks (heartbeat monitor, admin server) subscribe and drop
/// their receiver when they have finished draining.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait until every subscriber has gone away or `timeout` elapses.
    ///
    /// Returns `true` when all subscribers drained in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.receiver_count() > 0 {
            if Instant::now() >= deadline {
                tracing::warn!(remaining = self.receiver_count(), "Shutdown drain timed out");
                return false;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
