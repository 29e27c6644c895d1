//! Durable Module
//!
//! Persistent, collection-oriented storage that survives restarts. Storage
//! failures are absorbed at this boundary and reported as [`Outcome`] values
//! instead of errors.

mod engine;
mod error;
mod lmdb;
mod memory;
mod store;

pub use engine::{StorageEngine, StorageUsage};
pub use error::{DurableError, Outcome};
pub use lmdb::LmdbEngine;
pub use memory::MemoryEngine;
pub use store::{
    CachedDurableItem, DurableRecord, DurableStore, StorageStats, DEFAULT_DURABLE_TTL_MINUTES,
    DEFAULT_DURABLE_VERSION,
};

/// Names of the collections created when the store opens.
pub mod collections {
    pub const BUS_ROUTES: &str = "busRoutes";
    pub const BUS_SCHEDULES: &str = "busSchedules";
    pub const NOTIFICATIONS: &str = "notifications";
    /// TTL'd items written through `DurableStore::cache`
    pub const CACHED_DATA: &str = "cachedData";
    /// Pending mutations, written only by the sync queue
    pub const SYNC_QUEUE: &str = "syncQueue";

    pub const ALL: [&str; 5] = [BUS_ROUTES, BUS_SCHEDULES, NOTIFICATIONS, CACHED_DATA, SYNC_QUEUE];
}
