//! Cache Entry Module
//!
//! Defines the structure for individual memory cache entries with TTL and
//! version tagging.

use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Key the entry was stored under
    pub key: String,
    /// The stored value
    pub data: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time to live in milliseconds, measured from `created_at`
    pub ttl_ms: u64,
    /// Version tag the entry was written with
    pub version: String,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now_ms`.
    pub fn new(
        key: impl Into<String>,
        data: Value,
        now_ms: u64,
        ttl_ms: u64,
        version: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            data,
            created_at: now_ms,
            ttl_ms,
            version: version.into(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// The entry stays valid while `now - created_at <= ttl`, so it is still
    /// served at exactly the TTL boundary and expires one millisecond later.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) > self.ttl_ms
    }

    // == Is Valid ==
    /// An entry is valid iff it has not expired and carries `current_version`.
    pub fn is_valid(&self, now_ms: u64, current_version: &str) -> bool {
        !self.is_expired(now_ms) && self.version == current_version
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(ttl_ms: u64) -> CacheEntry {
        CacheEntry::new("k", json!({"a": 1}), 1_000, ttl_ms, "1.0")
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry(60_000);

        assert_eq!(entry.key, "k");
        assert_eq!(entry.data, json!({"a": 1}));
        assert_eq!(entry.created_at, 1_000);
        assert!(!entry.is_expired(1_000));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry(500);

        // Still valid exactly at the TTL boundary
        assert!(!entry.is_expired(1_500));
        assert!(entry.is_expired(1_501));
    }

    #[test]
    fn test_zero_ttl_expires_after_creation_instant() {
        let entry = entry(0);
        assert!(!entry.is_expired(1_000));
        assert!(entry.is_expired(1_001));
    }

    #[test]
    fn test_version_mismatch_is_invalid() {
        let entry = entry(60_000);
        assert!(entry.is_valid(1_000, "1.0"));
        assert!(!entry.is_valid(1_000, "2.0"));
    }

    #[test]
    fn test_clock_before_creation_is_not_expired() {
        let entry = entry(100);
        assert!(!entry.is_expired(0));
    }
}
