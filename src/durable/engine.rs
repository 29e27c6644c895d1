//! Storage engine abstraction.
//!
//! An engine stores opaque byte values in named collections. Every method is
//! one transaction: callers never observe a half-applied write.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;

use crate::durable::DurableError;

/// Bytes used and still available, as reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub used: u64,
    pub available: u64,
}

/// Transactional, asynchronous, collection-oriented key/value engine.
///
/// Collections that were never created read as empty. Writing to a missing
/// collection creates it.
#[async_trait]
pub trait StorageEngine: Send + Sync + Debug {
    /// Creates the named collections if they do not exist yet.
    async fn ensure_collections(&self, names: &[&str]) -> Result<(), DurableError>;

    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), DurableError>;

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, DurableError>;

    /// Deletes one key. Returns whether it existed.
    async fn delete(&self, collection: &str, key: &str) -> Result<bool, DurableError>;

    /// Deletes several keys in one transaction. Returns how many existed.
    async fn delete_many(&self, collection: &str, keys: Vec<String>)
        -> Result<usize, DurableError>;

    /// Every record of a collection, ordered by key.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Vec<u8>)>, DurableError>;

    async fn clear(&self, collection: &str) -> Result<(), DurableError>;

    /// Clears the collection and inserts `records` in a single transaction.
    async fn replace_all(
        &self,
        collection: &str,
        records: Vec<(String, Vec<u8>)>,
    ) -> Result<(), DurableError>;

    /// Storage usage, or `None` when the engine cannot introspect it.
    async fn usage(&self) -> Result<Option<StorageUsage>, DurableError>;
}
