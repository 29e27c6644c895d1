//! Cache Module
//!
//! In-memory caching with TTL expiration, version tagging and bounded-size
//! eviction.

mod entry;
mod eviction;
mod memory;
mod stats;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::CacheEntry;
pub use eviction::{EvictionPolicy, EvictionTracker};
pub use memory::{prefetch, MemoryCache};
pub use stats::CacheStats;

/// Memory cache shared across tasks.
pub type SharedCache = Arc<RwLock<MemoryCache>>;

// == Public Constants ==
/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default TTL in milliseconds (5 minutes)
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// Version tag used when the caller does not supply one
pub const DEFAULT_VERSION: &str = "1.0";
