//! API Handlers
//!
//! HTTP request handlers for each diagnostics endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::cache::{MemoryCache, SharedCache};
use crate::clock::SharedClock;
use crate::config::Config;
use crate::durable::collections::{CACHED_DATA, SYNC_QUEUE};
use crate::durable::{DurableError, DurableRecord, DurableStore, StorageEngine, StorageStats};
use crate::error::{ApiError, Result};
use crate::metrics::MetricRecorder;
use crate::models::{
    CacheStatsResponse, CachedValueResponse, CollectionRequest, CollectionResponse,
    DurableCacheRequest, EnqueueRequest, HealthResponse, InvalidateQuery, InvalidateResponse,
    MetricsResponse, NetworkRequest, NetworkResponse, QueueResponse, SuccessResponse,
};
use crate::network::NetworkMonitor;
use crate::query::{QueryClient, QueryOptions};
use crate::sync::{Replayer, SyncEvent, SyncQueue, SyncQueueItem};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
    pub metrics: Arc<MetricRecorder>,
    pub query: QueryClient,
    pub store: DurableStore,
    pub sync: Arc<SyncQueue>,
    pub network: Arc<NetworkMonitor>,
    /// Options used for collection reads served through the query cache
    pub query_options: QueryOptions,
    pub durable_ttl_minutes: u64,
}

impl AppState {
    /// Wires every component from configuration.
    ///
    /// Also returns the receiving end of the sync event channel, which the
    /// caller hands to the sync worker.
    pub async fn build(
        config: &Config,
        engine: Arc<dyn StorageEngine>,
        replayer: Arc<dyn Replayer>,
        network: Arc<NetworkMonitor>,
        clock: SharedClock,
    ) -> std::result::Result<(Self, mpsc::UnboundedReceiver<SyncEvent>), DurableError> {
        let cache: SharedCache = Arc::new(RwLock::new(MemoryCache::with_policy(
            config.max_entries,
            config.default_ttl_ms,
            config.eviction_policy,
            clock.clone(),
        )));
        let metrics = Arc::new(MetricRecorder::new(config.metrics_capacity, clock.clone()));
        let store = DurableStore::open(engine, clock.clone()).await?;
        let (sync, events) = SyncQueue::new(
            store.clone(),
            replayer,
            network.clone(),
            config.sync_config(),
            clock,
        );

        let state = Self {
            query: QueryClient::new(cache.clone(), metrics.clone()),
            cache,
            metrics,
            store,
            sync: Arc::new(sync),
            network,
            query_options: QueryOptions::default().with_version(config.cache_version.clone()),
            durable_ttl_minutes: config.durable_ttl_minutes,
        };
        Ok((state, events))
    }
}

fn collection_cache_key(name: &str) -> String {
    format!("collection:{name}")
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.network.is_online()))
}

// == Memory Cache ==

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let cache = state.cache.read().await;
    Json(CacheStatsResponse::new(&cache.stats(), cache.max_entries()))
}

/// Handler for DELETE /cache?pattern=
///
/// Invalidates keys containing `pattern`, or clears the cache when no
/// pattern is given.
pub async fn invalidate_cache_handler(
    State(state): State<AppState>,
    Query(query): Query<InvalidateQuery>,
) -> Json<InvalidateResponse> {
    let mut cache = state.cache.write().await;
    let removed = match query.pattern.as_deref() {
        Some(pattern) if !pattern.is_empty() => cache.invalidate(pattern),
        _ => {
            let removed = cache.len();
            cache.clear();
            removed
        }
    };
    Json(InvalidateResponse { removed })
}

// == Durable Cache ==

/// Handler for PUT /durable/cache
pub async fn put_durable_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<DurableCacheRequest>,
) -> Result<Json<SuccessResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let ttl_minutes = req.ttl_minutes.unwrap_or(state.durable_ttl_minutes);
    let stored = state.store.cache(&req.key, req.data, ttl_minutes).await;
    Ok(Json(SuccessResponse::new(stored.into_value())))
}

/// Handler for GET /durable/cache/:key
///
/// Expired and never-cached keys are both 404.
pub async fn get_durable_cache_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CachedValueResponse>> {
    match state.store.get_cached(&key).await.into_value() {
        Some(data) => Ok(Json(CachedValueResponse::new(key, data))),
        None => Err(ApiError::NotFound(key)),
    }
}

/// Handler for DELETE /durable/cache/:key
pub async fn delete_durable_cache_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<SuccessResponse> {
    Json(SuccessResponse::new(
        state.store.remove_cached(&key).await.into_value(),
    ))
}

// == Collections ==

/// Handler for PUT /collections/:name
///
/// Replaces the collection and drops its cached read.
pub async fn put_collection_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<CollectionRequest>,
) -> Result<Json<SuccessResponse>> {
    if name == SYNC_QUEUE || name == CACHED_DATA {
        return Err(ApiError::InvalidRequest(format!(
            "Collection '{name}' is managed internally"
        )));
    }
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let stored = state.store.store_collection(&name, req.records).await;
    state.cache.write().await.delete(&collection_cache_key(&name));
    Ok(Json(SuccessResponse::new(stored.into_value())))
}

/// Handler for GET /collections/:name
///
/// Reads go through the query cache. A degraded read returns an empty list
/// and is not cached.
pub async fn get_collection_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<CollectionResponse> {
    let store = &state.store;
    let collection = name.as_str();
    let records = state
        .query
        .query(
            &collection_cache_key(collection),
            move || async move { store.get_collection(collection).await.into_result() },
            &state.query_options,
        )
        .await;

    let records: Vec<DurableRecord> = records.unwrap_or_else(|e| {
        warn!(collection = %name, error = %e, "serving empty collection");
        Vec::new()
    });
    Json(CollectionResponse::new(name, records))
}

/// Handler for GET /storage/stats
pub async fn storage_stats_handler(State(state): State<AppState>) -> Json<StorageStats> {
    Json(state.store.storage_stats().await.into_value())
}

// == Sync Queue ==

/// Handler for POST /sync/enqueue
pub async fn enqueue_handler(
    State(state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> (StatusCode, Json<SyncQueueItem>) {
    let item = state.sync.enqueue(req.action, req.payload).await;
    (StatusCode::CREATED, Json(item))
}

/// Handler for GET /sync/queue
pub async fn sync_queue_handler(State(state): State<AppState>) -> Json<QueueResponse> {
    Json(QueueResponse::new(
        state.network.is_online(),
        state.sync.pending().await,
    ))
}

/// Handler for POST /sync/drain
///
/// Only schedules a drain; the sync worker performs it.
pub async fn drain_handler(State(state): State<AppState>) -> StatusCode {
    state.sync.request_drain();
    StatusCode::ACCEPTED
}

/// Handler for PUT /network
pub async fn network_handler(
    State(state): State<AppState>,
    Json(req): Json<NetworkRequest>,
) -> Json<NetworkResponse> {
    let changed = state.network.set_online(req.online);
    Json(NetworkResponse {
        online: state.network.is_online(),
        changed,
    })
}

// == Metrics ==

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse::new(
        state.metrics.all(),
        state.metrics.capacity(),
    ))
}

/// Handler for DELETE /metrics
pub async fn clear_metrics_handler(State(state): State<AppState>) -> StatusCode {
    state.metrics.clear();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::clock::ManualClock;
    use crate::durable::MemoryEngine;
    use crate::sync::SimulatedReplayer;
    use std::time::Duration;

    pub(crate) async fn state_with(engine: Arc<MemoryEngine>, online: bool) -> AppState {
        let (state, _events) = AppState::build(
            &Config::default(),
            engine,
            Arc::new(SimulatedReplayer::new(Duration::from_millis(1))),
            Arc::new(NetworkMonitor::new(online)),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        )
        .await
        .unwrap();
        state
    }

    pub(crate) async fn state() -> AppState {
        state_with(Arc::new(MemoryEngine::new()), true).await
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{state, state_with};
    use super::*;
    use crate::durable::MemoryEngine;
    use crate::sync::SyncAction;
    use serde_json::json;

    #[tokio::test]
    async fn test_durable_cache_round_trip() {
        let state = state().await;
        let req = DurableCacheRequest {
            key: "departures".to_string(),
            data: json!([{"stop": "Library"}]),
            ttl_minutes: None,
        };

        let stored = put_durable_cache_handler(State(state.clone()), Json(req))
            .await
            .unwrap();
        assert!(stored.success);

        let fetched = get_durable_cache_handler(State(state), Path("departures".to_string()))
            .await
            .unwrap();
        assert_eq!(fetched.data, json!([{"stop": "Library"}]));
    }

    #[tokio::test]
    async fn test_build_applies_configured_eviction_policy() {
        use crate::cache::EvictionPolicy;
        use crate::clock::ManualClock;
        use crate::sync::SimulatedReplayer;
        use std::time::Duration;

        let config = Config {
            max_entries: 2,
            eviction_policy: EvictionPolicy::LeastRecentlyUsed,
            ..Config::default()
        };
        let (state, _events) = AppState::build(
            &config,
            Arc::new(MemoryEngine::new()),
            Arc::new(SimulatedReplayer::new(Duration::from_millis(1))),
            Arc::new(NetworkMonitor::new(true)),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        )
        .await
        .unwrap();

        let mut cache = state.cache.write().await;
        assert_eq!(cache.policy(), EvictionPolicy::LeastRecentlyUsed);
        cache.set("a", json!(1), None, None);
        cache.set("b", json!(2), None, None);
        assert!(cache.get("a", None).is_some());
        cache.set("c", json!(3), None, None);

        // "a" was read last, so "b" is the one evicted
        assert!(cache.contains_key("a"));
        assert!(!cache.contains_key("b"));
    }

    #[tokio::test]
    async fn test_get_missing_durable_key() {
        let state = state().await;

        let result = get_durable_cache_handler(State(state), Path("nope".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_durable_cache_invalid_request() {
        let state = state().await;
        let req = DurableCacheRequest {
            key: "".to_string(),
            data: json!(1),
            ttl_minutes: None,
        };

        let result = put_durable_cache_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_storage_failure_reports_unsuccessful_write() {
        let engine = Arc::new(MemoryEngine::new());
        let state = state_with(engine.clone(), true).await;
        engine.set_failing(true);

        let req = DurableCacheRequest {
            key: "k".to_string(),
            data: json!(1),
            ttl_minutes: Some(5),
        };
        let response = put_durable_cache_handler(State(state), Json(req))
            .await
            .unwrap();
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_collection_read_is_cached_until_replaced() {
        let state = state().await;
        let first = CollectionRequest {
            records: vec![DurableRecord::new("r1", json!({"name": "Loop"}))],
        };
        put_collection_handler(State(state.clone()), Path("busRoutes".into()), Json(first))
            .await
            .unwrap();

        let read = get_collection_handler(State(state.clone()), Path("busRoutes".into())).await;
        assert_eq!(read.count, 1);
        let read = get_collection_handler(State(state.clone()), Path("busRoutes".into())).await;
        assert_eq!(read.count, 1);
        assert_eq!(state.metrics.by_name("cache_hit").len(), 1);

        let second = CollectionRequest {
            records: vec![
                DurableRecord::new("r2", json!({})),
                DurableRecord::new("r3", json!({})),
            ],
        };
        put_collection_handler(State(state.clone()), Path("busRoutes".into()), Json(second))
            .await
            .unwrap();

        let read = get_collection_handler(State(state), Path("busRoutes".into())).await;
        let ids: Vec<_> = read.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);
    }

    #[tokio::test]
    async fn test_degraded_collection_read_is_not_cached() {
        let engine = Arc::new(MemoryEngine::new());
        let state = state_with(engine.clone(), true).await;
        engine.set_failing(true);

        let read = get_collection_handler(State(state.clone()), Path("busRoutes".into())).await;
        assert_eq!(read.count, 0);
        assert!(!state
            .cache
            .read()
            .await
            .contains_key(&collection_cache_key("busRoutes")));
    }

    #[tokio::test]
    async fn test_internal_collections_are_read_only() {
        let state = state().await;
        let req = CollectionRequest { records: vec![] };

        let result =
            put_collection_handler(State(state), Path(SYNC_QUEUE.to_string()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_without_pattern_clears() {
        let state = state().await;
        {
            let mut cache = state.cache.write().await;
            cache.set("a", json!(1), None, None);
            cache.set("b", json!(2), None, None);
        }

        let response =
            invalidate_cache_handler(State(state.clone()), Query(InvalidateQuery::default())).await;
        assert_eq!(response.removed, 2);
        assert!(state.cache.read().await.stats().last_cleared.is_some());
    }

    #[tokio::test]
    async fn test_enqueue_offline_and_list_queue() {
        let state = state_with(Arc::new(MemoryEngine::new()), false).await;
        let req = EnqueueRequest {
            action: SyncAction::Create,
            payload: json!({"title": "Detour"}),
        };

        let (status, item) = enqueue_handler(State(state.clone()), Json(req)).await;
        assert_eq!(status, StatusCode::CREATED);

        let queue = sync_queue_handler(State(state)).await;
        assert!(!queue.online);
        assert_eq!(queue.pending, 1);
        assert_eq!(queue.items[0].id, item.id);
    }

    #[tokio::test]
    async fn test_network_handler_reports_change() {
        let state = state_with(Arc::new(MemoryEngine::new()), false).await;

        let response =
            network_handler(State(state.clone()), Json(NetworkRequest { online: true })).await;
        assert!(response.online);
        assert!(response.changed);

        let response = network_handler(State(state), Json(NetworkRequest { online: true })).await;
        assert!(!response.changed);
    }

    #[tokio::test]
    async fn test_metrics_clear() {
        let state = state().await;
        state.metrics.record("cache_hit", 1.0, None);

        assert_eq!(metrics_handler(State(state.clone())).await.count, 1);
        assert_eq!(
            clear_metrics_handler(State(state.clone())).await,
            StatusCode::NO_CONTENT
        );
        assert_eq!(metrics_handler(State(state)).await.count, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(state().await)).await;
        assert_eq!(response.status, "healthy");
        assert!(response.online);
    }
}
