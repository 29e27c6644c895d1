//! Replay of queued mutations against the authoritative backend.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::sync::SyncQueueItem;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// The backend could not be reached
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// The backend refused the mutation
    #[error("Backend rejected mutation: {0}")]
    Rejected(String),

    #[error("Replay timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends one queued mutation to the backend.
///
/// The same item may be replayed more than once (a success can be lost
/// before it is recorded), so implementations should treat `item.id` as an
/// idempotency key.
#[async_trait]
pub trait Replayer: Send + Sync {
    async fn replay(&self, item: &SyncQueueItem) -> Result<(), ReplayError>;
}

/// Stand-in backend that waits a fixed delay and accepts everything.
#[derive(Debug, Clone)]
pub struct SimulatedReplayer {
    delay: Duration,
}

impl SimulatedReplayer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedReplayer {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl Replayer for SimulatedReplayer {
    async fn replay(&self, item: &SyncQueueItem) -> Result<(), ReplayError> {
        tokio::time::sleep(self.delay).await;
        debug!(id = %item.id, action = ?item.action, "simulated replay accepted");
        Ok(())
    }
}
