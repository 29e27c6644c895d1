//! In-process storage engine.
//!
//! Keeps collections in ordered maps. Nothing survives the process, so this
//! engine backs tests and serves as the fallback when no durable engine can
//! be opened. It can be told to fail, or given a byte quota, to reproduce
//! the storage failures the durable store has to absorb.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::durable::{DurableError, StorageEngine, StorageUsage};

type Collections = HashMap<String, BTreeMap<String, Vec<u8>>>;

#[derive(Debug, Default)]
pub struct MemoryEngine {
    collections: Mutex<Collections>,
    failing: AtomicBool,
    quota: Option<u64>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that rejects writes pushing total usage above `quota` bytes.
    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Makes every subsequent operation fail with `Unavailable` until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total bytes of keys and values held.
    pub fn used_bytes(&self) -> u64 {
        Self::usage_of(&self.lock())
    }

    fn check_available(&self) -> Result<(), DurableError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DurableError::Unavailable(
                "memory engine is failing".to_string(),
            ));
        }
        Ok(())
    }

    fn check_quota(&self, collections: &Collections) -> Result<(), DurableError> {
        match self.quota {
            Some(quota) => {
                let used = Self::usage_of(collections);
                if used > quota {
                    Err(DurableError::QuotaExceeded { used, quota })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    fn usage_of(collections: &Collections) -> u64 {
        collections
            .values()
            .flat_map(|records| records.iter())
            .map(|(key, value)| (key.len() + value.len()) as u64)
            .sum()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `write` to a copy of the collection and keeps it only if the
    /// quota still holds, so a rejected write leaves no trace.
    fn write_collection<T>(
        &self,
        collection: &str,
        write: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> T,
    ) -> Result<T, DurableError> {
        self.check_available()?;
        let mut collections = self.lock();
        let previous = collections.get(collection).cloned();

        let records = collections.entry(collection.to_string()).or_default();
        let result = write(records);

        if let Err(e) = self.check_quota(&collections) {
            match previous {
                Some(previous) => collections.insert(collection.to_string(), previous),
                None => collections.remove(collection),
            };
            return Err(e);
        }
        Ok(result)
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    async fn ensure_collections(&self, names: &[&str]) -> Result<(), DurableError> {
        self.check_available()?;
        let mut collections = self.lock();
        for name in names {
            collections.entry(name.to_string()).or_default();
        }
        Ok(())
    }

    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), DurableError> {
        self.write_collection(collection, |records| {
            records.insert(key.to_string(), value);
        })
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, DurableError> {
        self.check_available()?;
        Ok(self
            .lock()
            .get(collection)
            .and_then(|records| records.get(key).cloned()))
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, DurableError> {
        self.check_available()?;
        Ok(self
            .lock()
            .get_mut(collection)
            .map(|records| records.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn delete_many(
        &self,
        collection: &str,
        keys: Vec<String>,
    ) -> Result<usize, DurableError> {
        self.check_available()?;
        let mut collections = self.lock();
        let Some(records) = collections.get_mut(collection) else {
            return Ok(0);
        };
        Ok(keys
            .iter()
            .filter(|key| records.remove(key.as_str()).is_some())
            .count())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Vec<u8>)>, DurableError> {
        self.check_available()?;
        Ok(self
            .lock()
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn clear(&self, collection: &str) -> Result<(), DurableError> {
        self.check_available()?;
        if let Some(records) = self.lock().get_mut(collection) {
            records.clear();
        }
        Ok(())
    }

    async fn replace_all(
        &self,
        collection: &str,
        records: Vec<(String, Vec<u8>)>,
    ) -> Result<(), DurableError> {
        self.write_collection(collection, |existing| {
            existing.clear();
            existing.extend(records);
        })
    }

    async fn usage(&self) -> Result<Option<StorageUsage>, DurableError> {
        self.check_available()?;
        let Some(quota) = self.quota else {
            return Ok(None);
        };
        let used = self.used_bytes();
        Ok(Some(StorageUsage {
            used,
            available: quota.saturating_sub(used),
        }))
    }
}
