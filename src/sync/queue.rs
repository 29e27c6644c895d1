//! Sync Queue Manager
//!
//! Keeps pending mutations in memory, mirrors them into the durable
//! `syncQueue` collection, and replays them when the network is reachable.
//!
//! Item lifecycle:
//! `enqueued -> replay -> removed` on success, or
//! `enqueued -> replay fails -> retry_count += 1 -> enqueued` until
//! `retry_count` reaches `max_retries`, at which point the item is dropped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::clock::SharedClock;
use crate::durable::collections::SYNC_QUEUE;
use crate::durable::DurableStore;
use crate::network::NetworkMonitor;
use crate::sync::{ReplayError, Replayer, SyncAction, SyncQueueItem};

/// Failed replays tolerated before an item is dropped.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub max_retries: u32,
    /// Upper bound on a single replay call. `None` waits indefinitely.
    pub replay_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            replay_timeout: None,
        }
    }
}

impl SyncConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_replay_timeout(mut self, timeout: Duration) -> Self {
        self.replay_timeout = Some(timeout);
        self
    }
}

/// Messages consumed by the sync worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// An item was enqueued while online
    Enqueued,
    /// Someone asked for a drain explicitly
    DrainRequested,
}

/// What one drain pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Failed but still queued for another attempt
    pub retried: usize,
    /// Failed for the last time and discarded
    pub dropped: usize,
}

pub struct SyncQueue {
    items: Mutex<VecDeque<SyncQueueItem>>,
    store: DurableStore,
    replayer: Arc<dyn Replayer>,
    network: Arc<NetworkMonitor>,
    events: mpsc::UnboundedSender<SyncEvent>,
    config: SyncConfig,
    clock: SharedClock,
}

impl SyncQueue {
    /// Creates an empty queue plus the receiving end of its event channel,
    /// which belongs to the sync worker.
    pub fn new(
        store: DurableStore,
        replayer: Arc<dyn Replayer>,
        network: Arc<NetworkMonitor>,
        config: SyncConfig,
        clock: SharedClock,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let queue = Self {
            items: Mutex::new(VecDeque::new()),
            store,
            replayer,
            network,
            events,
            config,
            clock,
        };
        (queue, events_rx)
    }

    pub fn network(&self) -> &Arc<NetworkMonitor> {
        &self.network
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // == Restore ==
    /// Loads items persisted by a previous run, in enqueue order.
    ///
    /// Items already in memory are kept. Returns the number of items added.
    pub async fn restore(&self) -> usize {
        let records = self.store.get_collection(SYNC_QUEUE).await.into_value();

        let mut restored: Vec<SyncQueueItem> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                SyncQueueItem::from_record(record)
                    .map_err(|e| warn!(id = %id, error = %e, "skipping unreadable sync item"))
                    .ok()
            })
            .collect();
        restored.sort_by(|a, b| (a.enqueued_at, &a.id).cmp(&(b.enqueued_at, &b.id)));

        let mut items = self.items.lock().await;
        let mut added = 0;
        for item in restored {
            if !items.iter().any(|existing| existing.id == item.id) {
                items.push_back(item);
                added += 1;
            }
        }

        if added > 0 {
            info!(restored = added, "restored pending sync items");
        }
        added
    }

    // == Enqueue ==
    /// Persists a mutation, then queues it in memory.
    ///
    /// When online, a drain is requested without waiting for it.
    pub async fn enqueue(&self, action: SyncAction, payload: Value) -> SyncQueueItem {
        let item = SyncQueueItem::new(action, payload, self.clock.now());
        // Durable copy first: a drain must never see an item whose record
        // could still be written after the drain deleted it
        self.persist(&item).await;
        self.items.lock().await.push_back(item.clone());
        debug!(id = %item.id, action = ?action, "enqueued sync item");

        if self.network.is_online() {
            self.notify(SyncEvent::Enqueued);
        }
        item
    }

    /// Asks the worker to drain soon.
    pub fn request_drain(&self) {
        self.notify(SyncEvent::DrainRequested);
    }

    // == Drain ==
    /// Replays a snapshot of the queue in FIFO order.
    ///
    /// Items enqueued while the pass runs wait for the next drain. A failing
    /// item never blocks the ones behind it. Does nothing while offline.
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        if !self.network.is_online() {
            debug!("offline, skipping sync drain");
            return report;
        }

        let snapshot: Vec<SyncQueueItem> = self.items.lock().await.iter().cloned().collect();

        for item in snapshot {
            report.attempted += 1;
            match self.replay(&item).await {
                Ok(()) => {
                    self.remove(&item.id).await;
                    report.succeeded += 1;
                    debug!(id = %item.id, "sync item replayed");
                }
                Err(e) => {
                    if self.record_failure(&item.id, &e).await {
                        report.dropped += 1;
                    } else {
                        report.retried += 1;
                    }
                }
            }
        }

        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                succeeded = report.succeeded,
                retried = report.retried,
                dropped = report.dropped,
                "sync drain finished"
            );
        }
        report
    }

    // == Queries ==
    /// Snapshot of pending items in queue order.
    pub async fn pending(&self) -> Vec<SyncQueueItem> {
        self.items.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    async fn replay(&self, item: &SyncQueueItem) -> Result<(), ReplayError> {
        match self.config.replay_timeout {
            Some(limit) => tokio::time::timeout(limit, self.replayer.replay(item))
                .await
                .unwrap_or(Err(ReplayError::Timeout(limit))),
            None => self.replayer.replay(item).await,
        }
    }

    /// Bumps the retry count of a failed item. Returns `true` when the item
    /// ran out of retries and was dropped.
    async fn record_failure(&self, id: &str, reason: &ReplayError) -> bool {
        let (item, exhausted) = {
            let mut items = self.items.lock().await;
            let Some(position) = items.iter().position(|item| item.id == id) else {
                return false;
            };
            items[position].retry_count += 1;

            if items[position].retry_count >= self.config.max_retries {
                match items.remove(position) {
                    Some(item) => (item, true),
                    None => return false,
                }
            } else {
                (items[position].clone(), false)
            }
        };

        if exhausted {
            error!(
                id = %item.id,
                action = ?item.action,
                retries = item.retry_count,
                error = %reason,
                "dropping sync item after exhausting retries"
            );
            let _ = self.store.delete_record(SYNC_QUEUE, &item.id).await;
        } else {
            warn!(
                id = %item.id,
                retry_count = item.retry_count,
                error = %reason,
                "sync replay failed, will retry"
            );
            self.persist(&item).await;
        }
        exhausted
    }

    async fn remove(&self, id: &str) {
        self.items.lock().await.retain(|item| item.id != id);
        let _ = self.store.delete_record(SYNC_QUEUE, id).await;
    }

    /// Mirrors an item into the durable collection. Returns whether it stuck.
    async fn persist(&self, item: &SyncQueueItem) -> bool {
        match item.to_record() {
            Ok(record) => self.store.put_record(SYNC_QUEUE, &record).await.into_value(),
            Err(e) => {
                warn!(id = %item.id, error = %e, "cannot encode sync item");
                false
            }
        }
    }

    fn notify(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            debug!(?event, "sync worker not running, event ignored");
        }
    }
}
