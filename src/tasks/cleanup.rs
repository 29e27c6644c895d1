//! Durable Cleanup Task
//!
//! The durable store never expires items on its own; this task sweeps the
//! `cachedData` collection periodically.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::durable::DurableStore;

/// Spawns a task that calls [`DurableStore::cleanup_expired`] every
/// `interval`.
///
/// The first sweep happens one interval after spawning. Abort the returned
/// handle to stop the task during shutdown.
pub fn spawn_cleanup_task(store: DurableStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting durable cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.cleanup_expired().await.into_value();
            if removed > 0 {
                info!(removed, "durable cleanup removed expired items");
            } else {
                debug!("durable cleanup found nothing to remove");
            }
        }
    })
}
