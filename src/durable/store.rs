//! Durable Store
//!
//! Policy layer over a [`StorageEngine`]: JSON encoding, TTL'd cache items,
//! whole-collection replacement, and fail-soft reporting through [`Outcome`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::durable::collections::{self, CACHED_DATA};
use crate::durable::{DurableError, Outcome, StorageEngine, StorageUsage};

/// Version stamped on durable cache items when none is configured.
pub const DEFAULT_DURABLE_VERSION: &str = "1.0";

/// Default lifetime of a durable cache item.
pub const DEFAULT_DURABLE_TTL_MINUTES: u64 = 60;

// == Records ==
/// One application record of a named collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableRecord {
    pub id: String,
    pub data: Value,
}

impl DurableRecord {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Persistent cache item stored in the `cachedData` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedDurableItem {
    pub key: String,
    pub data: Value,
    /// Write time, Unix milliseconds
    pub timestamp: u64,
    /// Expiry, Unix milliseconds
    pub expires_at: u64,
    pub version: String,
}

impl CachedDurableItem {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }
}

/// Best-effort storage usage in bytes.
pub type StorageStats = StorageUsage;

// == Durable Store ==
/// Shared handle to the persistent store.
#[derive(Debug, Clone)]
pub struct DurableStore {
    engine: Arc<dyn StorageEngine>,
    clock: SharedClock,
    version: String,
}

impl DurableStore {
    /// Opens the store and creates the built-in collections.
    pub async fn open(
        engine: Arc<dyn StorageEngine>,
        clock: SharedClock,
    ) -> Result<Self, DurableError> {
        engine.ensure_collections(&collections::ALL).await?;
        info!(collections = collections::ALL.len(), "durable store ready");
        Ok(Self {
            engine,
            clock,
            version: DEFAULT_DURABLE_VERSION.to_string(),
        })
    }

    /// Sets the version stamped on new cache items. Items written under any
    /// other version read as misses.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }

    // == Cache ==
    /// Persists `data` under `key` for `ttl_minutes`.
    ///
    /// The value is `true` when the item was written.
    pub async fn cache(&self, key: &str, data: Value, ttl_minutes: u64) -> Outcome<bool> {
        Outcome::settle("cache", self.try_cache(key, data, ttl_minutes).await, false)
    }

    // == Get Cached ==
    /// Reads a cached item.
    ///
    /// Expired, foreign-version and unparseable items are deleted and read as
    /// `None`, exactly like a key that was never cached.
    pub async fn get_cached(&self, key: &str) -> Outcome<Option<Value>> {
        Outcome::settle("get_cached", self.try_get_cached(key).await, None)
    }

    // == Remove Cached ==
    /// Deletes a cached item. Removing a missing key succeeds.
    pub async fn remove_cached(&self, key: &str) -> Outcome<bool> {
        let result = self.engine.delete(CACHED_DATA, key).await.map(|_| true);
        Outcome::settle("remove_cached", result, false)
    }

    // == Cleanup Expired ==
    /// Deletes every cached item whose expiry has passed.
    ///
    /// Unparseable items are removed as well. The value is the number of
    /// items deleted.
    pub async fn cleanup_expired(&self) -> Outcome<usize> {
        Outcome::settle("cleanup_expired", self.try_cleanup_expired().await, 0)
    }

    // == Collections ==
    /// Replaces the whole collection with `records`.
    ///
    /// This is not a merge: records missing from `records` are gone afterwards.
    pub async fn store_collection(&self, name: &str, records: Vec<DurableRecord>) -> Outcome<bool> {
        let count = records.len();
        let result = self.try_store_collection(name, records).await.map(|_| true);
        if result.is_ok() {
            info!(collection = name, records = count, "stored collection");
        }
        Outcome::settle("store_collection", result, false)
    }

    /// Every record of a collection, ordered by id. Unreadable records are
    /// skipped.
    pub async fn get_collection(&self, name: &str) -> Outcome<Vec<DurableRecord>> {
        let result = self.engine.list(name).await.map(|rows| {
            rows.into_iter()
                .filter_map(|(id, bytes)| match serde_json::from_slice::<DurableRecord>(&bytes) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(collection = name, id = %id, error = %e, "skipping unreadable record");
                        None
                    }
                })
                .collect()
        });
        Outcome::settle("get_collection", result, Vec::new())
    }

    /// Inserts or overwrites one record.
    pub async fn put_record(&self, name: &str, record: &DurableRecord) -> Outcome<bool> {
        Outcome::settle("put_record", self.try_put_record(name, record).await, false)
    }

    /// Deletes one record. The value is whether it existed.
    pub async fn delete_record(&self, name: &str, id: &str) -> Outcome<bool> {
        let result = self.engine.delete(name, id).await;
        Outcome::settle("delete_record", result, false)
    }

    pub async fn clear_collection(&self, name: &str) -> Outcome<bool> {
        let result = self.engine.clear(name).await.map(|_| true);
        Outcome::settle("clear_collection", result, false)
    }

    // == Storage Stats ==
    /// Bytes used and available, `{0, 0}` when the engine cannot tell.
    pub async fn storage_stats(&self) -> Outcome<StorageStats> {
        let result = self
            .engine
            .usage()
            .await
            .map(|usage| usage.unwrap_or_default());
        Outcome::settle("storage_stats", result, StorageStats::default())
    }

    // == Fallible Internals ==

    async fn try_cache(&self, key: &str, data: Value, ttl_minutes: u64) -> Result<bool, DurableError> {
        let now = self.clock.now_ms();
        let item = CachedDurableItem {
            key: key.to_string(),
            data,
            timestamp: now,
            expires_at: now.saturating_add(ttl_minutes.saturating_mul(60_000)),
            version: self.version.clone(),
        };
        let bytes = serde_json::to_vec(&item)?;
        self.engine.put(CACHED_DATA, key, bytes).await?;
        Ok(true)
    }

    async fn try_get_cached(&self, key: &str) -> Result<Option<Value>, DurableError> {
        let Some(bytes) = self.engine.get(CACHED_DATA, key).await? else {
            return Ok(None);
        };

        let item = match serde_json::from_slice::<CachedDurableItem>(&bytes) {
            Ok(item) => item,
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable cached item");
                self.engine.delete(CACHED_DATA, key).await?;
                return Ok(None);
            }
        };

        if item.is_expired(self.clock.now_ms()) || item.version != self.version {
            debug!(key, "cached item no longer valid");
            self.engine.delete(CACHED_DATA, key).await?;
            return Ok(None);
        }

        Ok(Some(item.data))
    }

    async fn try_cleanup_expired(&self) -> Result<usize, DurableError> {
        let now = self.clock.now_ms();
        let stale: Vec<String> = self
            .engine
            .list(CACHED_DATA)
            .await?
            .into_iter()
            .filter(|(_, bytes)| {
                serde_json::from_slice::<CachedDurableItem>(bytes)
                    .map(|item| item.expires_at < now)
                    .unwrap_or(true)
            })
            .map(|(key, _)| key)
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }
        self.engine.delete_many(CACHED_DATA, stale).await
    }

    async fn try_store_collection(
        &self,
        name: &str,
        records: Vec<DurableRecord>,
    ) -> Result<(), DurableError> {
        let encoded = records
            .iter()
            .map(|record| serde_json::to_vec(record).map(|bytes| (record.id.clone(), bytes)))
            .collect::<Result<Vec<_>, serde_json::Error>>()?;
        self.engine.replace_all(name, encoded).await
    }

    async fn try_put_record(&self, name: &str, record: &DurableRecord) -> Result<bool, DurableError> {
        let bytes = serde_json::to_vec(record)?;
        self.engine.put(name, &record.id, bytes).await?;
        Ok(true)
    }
}
