//! Memory Cache Module
//!
//! In-process key/value cache with TTL expiration, version tagging and bounded
//! size. Expiration is lazy: stale entries are only removed when they are read.

use std::collections::HashMap;
use std::future::Future;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EvictionPolicy, EvictionTracker};
use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_MS, DEFAULT_VERSION};
use crate::clock::SharedClock;

// == Memory Cache ==
/// Main in-memory cache.
#[derive(Debug)]
pub struct MemoryCache {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Eviction order tracker
    tracker: EvictionTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL applied when `set` is called without one
    default_ttl_ms: u64,
    clock: SharedClock,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a cache with capacity `max_entries` and insertion-order eviction.
    pub fn new(max_entries: usize, default_ttl_ms: u64, clock: SharedClock) -> Self {
        Self::with_policy(
            max_entries,
            default_ttl_ms,
            EvictionPolicy::InsertionOrder,
            clock,
        )
    }

    /// Creates a cache with an explicit eviction policy.
    pub fn with_policy(
        max_entries: usize,
        default_ttl_ms: u64,
        policy: EvictionPolicy,
        clock: SharedClock,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            tracker: EvictionTracker::new(policy),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            default_ttl_ms,
            clock,
        }
    }

    /// Creates a cache with the stock limits (100 entries, 5 minute TTL).
    pub fn with_defaults(clock: SharedClock) -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL_MS, clock)
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.tracker.policy()
    }

    // == Set ==
    /// Stores `data` under `key`.
    ///
    /// A new key arriving at capacity evicts one entry first. Overwriting an
    /// existing key resets its TTL and version and never evicts.
    ///
    /// # Arguments
    /// * `ttl_ms` - TTL in milliseconds (default: 5 minutes)
    /// * `version` - Version tag (default: "1.0")
    pub fn set(&mut self, key: &str, data: Value, ttl_ms: Option<u64>, version: Option<&str>) {
        let is_overwrite = self.entries.contains_key(key);

        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted_key) = self.tracker.evict_oldest() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
                debug!(key = %evicted_key, "evicted cache entry");
            }
        }

        let entry = CacheEntry::new(
            key,
            data,
            self.clock.now_ms(),
            ttl_ms.unwrap_or(self.default_ttl_ms),
            version.unwrap_or(DEFAULT_VERSION),
        );
        self.entries.insert(key.to_string(), entry);
        self.tracker.record_insert(key);
        self.stats.set_size(self.entries.len());
    }

    // == Get ==
    /// Retrieves the value stored under `key` if it is fresh and tagged with
    /// `current_version` (default "1.0").
    ///
    /// Expired or version-mismatched entries are removed and counted as misses.
    pub fn get(&mut self, key: &str, current_version: Option<&str>) -> Option<Value> {
        self.get_as(key, current_version, |data| Some(data.clone()))
    }

    /// Like [`get`](Self::get), but the entry only counts as a hit when
    /// `decode` accepts it. A rejected entry is removed and counted as a miss.
    pub fn get_as<T>(
        &mut self,
        key: &str,
        current_version: Option<&str>,
        decode: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<T> {
        let version = current_version.unwrap_or(DEFAULT_VERSION);
        let now = self.clock.now_ms();

        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if !entry.is_valid(now, version) {
            debug!(key, "dropping stale cache entry");
            self.remove_entry(key);
            self.stats.record_miss();
            return None;
        }

        match decode(&entry.data) {
            Some(value) => {
                self.stats.record_hit();
                self.tracker.record_access(key);
                Some(value)
            }
            None => {
                debug!(key, "dropping undecodable cache entry");
                self.remove_entry(key);
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Invalidate ==
    /// Removes every entry whose key contains `pattern`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, pattern: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.contains(pattern))
            .cloned()
            .collect();

        for key in &matching {
            self.remove_entry(key);
        }

        if !matching.is_empty() {
            debug!(pattern, removed = matching.len(), "invalidated cache entries");
        }
        matching.len()
    }

    // == Clear ==
    /// Empties the cache and stamps the clear time.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tracker.clear();
        self.stats.record_clear(self.clock.now());
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a key is physically present, fresh or not. Does not touch stats.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.tracker.remove(key);
            self.stats.set_size(self.entries.len());
        }
        removed
    }
}

// == Prefetch ==
/// Returns the cached value for `key`, or awaits `provider` and caches its
/// result.
///
/// The lock is released while `provider` runs, so concurrent callers for the
/// same key each invoke their own provider and the last write wins. A failing
/// provider leaves the cache untouched.
pub async fn prefetch<F, Fut, E>(
    cache: &RwLock<MemoryCache>,
    key: &str,
    provider: F,
    ttl_ms: Option<u64>,
) -> Result<Value, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, E>>,
{
    if let Some(cached) = cache.write().await.get(key, None) {
        return Ok(cached);
    }

    let data = provider().await?;
    cache.write().await.set(key, data.clone(), ttl_ms, None);
    Ok(data)
}
