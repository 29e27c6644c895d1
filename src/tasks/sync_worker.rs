//! Sync Worker Task
//!
//! Sole consumer of the sync queue's event channel. Drains run one at a time
//! in this task, so two passes never overlap.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::sync::{SyncEvent, SyncQueue};

/// Spawns the worker that drains `queue` whenever an event arrives or the
/// network comes back online.
///
/// Events that pile up while a drain is running are folded into the next
/// pass. Items already queued when the task starts (restored or enqueued
/// before spawning) get one startup drain when online, which also absorbs
/// the events sent for them.
pub fn spawn_sync_worker(
    queue: Arc<SyncQueue>,
    mut events: mpsc::UnboundedReceiver<SyncEvent>,
) -> JoinHandle<()> {
    let mut online = queue.network().subscribe();

    tokio::spawn(async move {
        info!("starting sync worker");

        // The startup pass covers every event and transition seen so far
        let online_now = *online.borrow_and_update();
        while events.try_recv().is_ok() {}
        if online_now && !queue.is_empty().await {
            queue.drain().await;
        }

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("sync event channel closed, stopping worker");
                        break;
                    };
                    let mut coalesced = 0usize;
                    while events.try_recv().is_ok() {
                        coalesced += 1;
                    }
                    debug!(?event, coalesced, "sync worker woke");
                }
                changed = online.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if !*online.borrow_and_update() {
                        continue;
                    }
                    info!("network is back, draining sync queue");
                }
            }

            queue.drain().await;
        }
    })
}
