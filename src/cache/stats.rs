//! Cache Statistics Module
//!
//! Tracks memory cache counters: hits, misses, evictions and the last clear.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Stats ==
/// Immutable snapshot of memory cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed retrievals (absent, expired or version mismatch)
    pub misses: u64,
    /// Number of entries evicted to make room for new keys
    pub evictions: u64,
    /// Current number of entries in the cache
    pub size: usize,
    /// When the cache was last cleared, if ever
    pub last_cleared: Option<DateTime<Utc>>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    // == Record Clear ==
    /// Resets the size and stamps the clear time.
    pub fn record_clear(&mut self, at: DateTime<Utc>) {
        self.size = 0;
        self.last_cleared = Some(at);
    }
}
