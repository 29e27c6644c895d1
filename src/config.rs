//! Configuration Module
//!
//! Loads server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{EvictionPolicy, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_MS, DEFAULT_VERSION};
use crate::durable::DEFAULT_DURABLE_TTL_MINUTES;
use crate::metrics::DEFAULT_METRICS_CAPACITY;
use crate::sync::{SyncConfig, DEFAULT_MAX_RETRIES};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the memory cache can hold
    pub max_entries: usize,
    /// Memory cache TTL in milliseconds for entries without explicit TTL
    pub default_ttl_ms: u64,
    /// Which key the memory cache drops when a new key arrives at capacity
    pub eviction_policy: EvictionPolicy,
    /// Version tag expected by cached queries
    pub cache_version: String,
    /// Samples kept by the metric recorder
    pub metrics_capacity: usize,
    /// Directory of the LMDB environment
    pub data_dir: PathBuf,
    pub store_map_size_mb: usize,
    /// TTL in minutes for durable cache writes without explicit TTL
    pub durable_ttl_minutes: u64,
    pub sync_max_retries: u32,
    /// Per-replay timeout; `None` waits indefinitely
    pub replay_timeout_ms: Option<u64>,
    /// HTTP server port
    pub server_port: u16,
    /// Durable cleanup interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Memory cache capacity (default: 100)
    /// - `DEFAULT_TTL_MS` - Memory cache TTL in ms (default: 300000)
    /// - `EVICTION_POLICY` - `insertion_order` or `lru` (default: insertion_order)
    /// - `CACHE_VERSION` - Cache version tag (default: "1.0")
    /// - `METRICS_CAPACITY` - Metric samples kept (default: 100)
    /// - `DATA_DIR` - LMDB directory (default: ./offline-data)
    /// - `STORE_MAP_SIZE_MB` - LMDB map size (default: 64)
    /// - `DURABLE_TTL_MINUTES` - Durable cache TTL (default: 60)
    /// - `SYNC_MAX_RETRIES` - Replay attempts per item (default: 3)
    /// - `REPLAY_TIMEOUT_MS` - Replay timeout (default: unset)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Durable cleanup frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl_ms: parse_var("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            eviction_policy: parse_var("EVICTION_POLICY").unwrap_or(defaults.eviction_policy),
            cache_version: env::var("CACHE_VERSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.cache_version),
            metrics_capacity: parse_var("METRICS_CAPACITY").unwrap_or(defaults.metrics_capacity),
            data_dir: env::var("DATA_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            store_map_size_mb: parse_var("STORE_MAP_SIZE_MB")
                .unwrap_or(defaults.store_map_size_mb),
            durable_ttl_minutes: parse_var("DURABLE_TTL_MINUTES")
                .unwrap_or(defaults.durable_ttl_minutes),
            sync_max_retries: parse_var("SYNC_MAX_RETRIES").unwrap_or(defaults.sync_max_retries),
            replay_timeout_ms: parse_var("REPLAY_TIMEOUT_MS"),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        let config = SyncConfig::default().with_max_retries(self.sync_max_retries);
        match self.replay_timeout_ms {
            Some(ms) => config.with_replay_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }

    pub fn cleanup_period(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl_ms: DEFAULT_TTL_MS,
            eviction_policy: EvictionPolicy::InsertionOrder,
            cache_version: DEFAULT_VERSION.to_string(),
            metrics_capacity: DEFAULT_METRICS_CAPACITY,
            data_dir: PathBuf::from("./offline-data"),
            store_map_size_mb: 64,
            durable_ttl_minutes: DEFAULT_DURABLE_TTL_MINUTES,
            sync_max_retries: DEFAULT_MAX_RETRIES,
            replay_timeout_ms: None,
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
