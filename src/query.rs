//! Cached Query Wrapper
//!
//! Puts the memory cache in front of an arbitrary async fetch and records
//! hit/miss/fetch-duration metrics. It never touches the durable store.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::cache::{SharedCache, DEFAULT_VERSION};
use crate::metrics::MetricRecorder;

/// Per-call options for [`QueryClient::query`].
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub version: String,
    /// `None` uses the cache's default TTL
    pub ttl_ms: Option<u64>,
    /// When false no `cache_hit`, `cache_miss` or `fetch_*` samples are recorded
    pub enable_metrics: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            ttl_ms: None,
            enable_metrics: true,
        }
    }
}

impl QueryOptions {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    pub fn without_metrics(mut self) -> Self {
        self.enable_metrics = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct QueryClient {
    cache: SharedCache,
    metrics: Arc<MetricRecorder>,
}

impl QueryClient {
    pub fn new(cache: SharedCache, metrics: Arc<MetricRecorder>) -> Self {
        Self { cache, metrics }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<MetricRecorder> {
        &self.metrics
    }

    // == Query ==
    /// Returns the cached value for `key` or runs `fetch` and caches its
    /// result under `options.version`.
    ///
    /// Errors from `fetch` are returned as-is and nothing is cached.
    pub async fn query<T, F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        options: &QueryOptions,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup::<T>(key, &options.version).await {
            debug!(key, "query served from cache");
            if options.enable_metrics {
                self.metrics.record("cache_hit", 1.0, Some(key_metadata(key)));
            }
            return Ok(value);
        }

        debug!(key, "query cache miss, fetching");
        let result = if options.enable_metrics {
            self.metrics.record("cache_miss", 1.0, Some(key_metadata(key)));
            self.metrics
                .measure_async(&format!("fetch_{key}"), fetch())
                .await?
        } else {
            fetch().await?
        };

        match serde_json::to_value(&result) {
            Ok(data) => {
                self.cache
                    .write()
                    .await
                    .set(key, data, options.ttl_ms, Some(&options.version));
            }
            Err(e) => warn!(key, error = %e, "query result is not cacheable"),
        }
        Ok(result)
    }

    /// Drops every cached query whose key contains `pattern`.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        self.cache.write().await.invalidate(pattern)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str, version: &str) -> Option<T> {
        self.cache
            .write()
            .await
            .get_as(key, Some(version), |cached| match serde_json::from_value::<T>(cached.clone()) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "cached value has the wrong shape, discarding");
                    None
                }
            })
    }
}

fn key_metadata(key: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("key".to_string(), json!(key));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::clock::ManualClock;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Route {
        id: u32,
        name: String,
    }

    fn client() -> (QueryClient, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(5_000_000));
        let cache = Arc::new(RwLock::new(MemoryCache::with_defaults(clock.clone())));
        let metrics = Arc::new(MetricRecorder::with_defaults(clock.clone()));
        (QueryClient::new(cache, metrics), clock)
    }

    fn route() -> Route {
        Route {
            id: 1,
            name: "Campus Loop".to_string(),
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit_fetches_once() {
        let (client, _clock) = client();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let options = QueryOptions::default();
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(route())
        };

        let first = client.query("routes:1", fetch, &options).await.unwrap();
        let second = client.query("routes:1", fetch, &options).await.unwrap();

        assert_eq!(first, route());
        assert_eq!(second, route());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let metrics = client.metrics();
        assert_eq!(metrics.by_name("cache_miss").len(), 1);
        assert_eq!(metrics.by_name("cache_hit").len(), 1);
        assert_eq!(metrics.by_name("fetch_routes:1_duration").len(), 1);
        assert_eq!(
            metrics.by_name("cache_hit")[0].metadata,
            Some(key_metadata("routes:1"))
        );
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_and_is_not_cached() {
        let (client, _clock) = client();
        let options = QueryOptions::default();

        let err = client
            .query::<Route, _, _, _>("routes:2", || async { Err("offline".to_string()) }, &options)
            .await
            .unwrap_err();

        assert_eq!(err, "offline");
        assert!(!client.cache().read().await.contains_key("routes:2"));
        assert_eq!(client.metrics().by_name("fetch_routes:2_duration").len(), 1);
    }

    #[tokio::test]
    async fn test_version_change_refetches() {
        let (client, _clock) = client();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(route())
        };

        client.query("routes", fetch, &QueryOptions::default()).await.unwrap();
        client
            .query("routes", fetch, &QueryOptions::default().with_version("2.0"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ttl_expiry_refetches() {
        let (client, clock) = client();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let options = QueryOptions::default().with_ttl_ms(1_000);
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(route())
        };

        client.query("routes", fetch, &options).await.unwrap();
        clock.advance_ms(1_001);
        client.query("routes", fetch, &options).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_metrics_disabled_records_nothing() {
        let (client, _clock) = client();
        let options = QueryOptions::default().without_metrics();

        client
            .query("routes", || async { Ok::<_, String>(route()) }, &options)
            .await
            .unwrap();
        client
            .query("routes", || async { Ok::<_, String>(route()) }, &options)
            .await
            .unwrap();

        assert!(client.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_a_miss() {
        let (client, _clock) = client();
        client
            .cache()
            .write()
            .await
            .set("routes", json!("not a route"), None, None);

        let fetched = client
            .query("routes", || async { Ok::<_, String>(route()) }, &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(fetched, route());
        assert_eq!(client.metrics().by_name("cache_miss").len(), 1);
        assert!(client.metrics().by_name("cache_hit").is_empty());

        let stats = client.cache().read().await.stats();
        assert_eq!(stats.hits, 0, "cache stats agree with the recorded miss");
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (client, _clock) = client();
        let options = QueryOptions::default();
        client
            .query("routes:1", || async { Ok::<_, String>(route()) }, &options)
            .await
            .unwrap();
        client
            .query("stops:1", || async { Ok::<_, String>(route()) }, &options)
            .await
            .unwrap();

        assert_eq!(client.invalidate("routes").await, 1);
        assert!(client.cache().read().await.contains_key("stops:1"));
        assert!(!client.cache().read().await.contains_key("routes:1"));
    }
}
