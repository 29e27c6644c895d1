//! Sync queue persistence across a restart on the LMDB engine.

use std::sync::Arc;
use std::time::Duration;

use offline_core::clock::ManualClock;
use offline_core::durable::{DurableStore, LmdbEngine};
use offline_core::network::NetworkMonitor;
use offline_core::sync::{SimulatedReplayer, SyncAction, SyncConfig, SyncQueue};
use serde_json::json;
use tempfile::TempDir;

async fn open_queue(dir: &TempDir, online: bool) -> SyncQueue {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let engine = LmdbEngine::open(dir.path(), 10).unwrap();
    let store = DurableStore::open(Arc::new(engine), clock.clone())
        .await
        .unwrap();
    let (queue, _events) = SyncQueue::new(
        store,
        Arc::new(SimulatedReplayer::new(Duration::from_millis(1))),
        Arc::new(NetworkMonitor::new(online)),
        SyncConfig::default(),
        clock,
    );
    queue
}

#[tokio::test]
async fn test_pending_items_survive_restart() {
    let dir = TempDir::new().unwrap();

    let (first, second) = {
        let queue = open_queue(&dir, false).await;
        let first = queue.enqueue(SyncAction::Create, json!({"n": 1})).await;
        let second = queue.enqueue(SyncAction::Delete, json!({"n": 2})).await;
        assert_eq!(queue.drain().await.attempted, 0);
        (first, second)
    };

    let queue = open_queue(&dir, true).await;
    assert_eq!(queue.restore().await, 2);
    assert_eq!(queue.pending().await, vec![first, second]);

    let report = queue.drain().await;
    assert_eq!(report.succeeded, 2);
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_replayed_items_do_not_come_back() {
    let dir = TempDir::new().unwrap();

    {
        let queue = open_queue(&dir, true).await;
        queue.enqueue(SyncAction::Update, json!({"n": 3})).await;
        assert_eq!(queue.drain().await.succeeded, 1);
    }

    let queue = open_queue(&dir, true).await;
    assert_eq!(queue.restore().await, 0);
}
