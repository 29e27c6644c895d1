//! Sync Module
//!
//! Offline mutation queue: items are persisted as they are enqueued and
//! replayed against the backend once the network is reachable.

mod item;
mod queue;
mod replay;

pub use item::{SyncAction, SyncQueueItem};
pub use queue::{DrainReport, SyncConfig, SyncEvent, SyncQueue, DEFAULT_MAX_RETRIES};
pub use replay::{ReplayError, Replayer, SimulatedReplayer};
