//! API Routes
//!
//! Configures the Axum router with all diagnostics endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, clear_metrics_handler, delete_durable_cache_handler, drain_handler,
    enqueue_handler, get_collection_handler, get_durable_cache_handler, health_handler,
    invalidate_cache_handler, metrics_handler, network_handler, put_collection_handler,
    put_durable_cache_handler, storage_stats_handler, sync_queue_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/cache", delete(invalidate_cache_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/durable/cache", put(put_durable_cache_handler))
        .route(
            "/durable/cache/:key",
            get(get_durable_cache_handler).delete(delete_durable_cache_handler),
        )
        .route(
            "/collections/:name",
            get(get_collection_handler).put(put_collection_handler),
        )
        .route("/storage/stats", get(storage_stats_handler))
        .route("/sync/enqueue", post(enqueue_handler))
        .route("/sync/queue", get(sync_queue_handler))
        .route("/sync/drain", post(drain_handler))
        .route("/network", put(network_handler))
        .route("/metrics", get(metrics_handler).delete(clear_metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
