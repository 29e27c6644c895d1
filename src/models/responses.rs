//! Response DTOs for the diagnostics API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::durable::DurableRecord;
use crate::metrics::PerformanceMetric;
use crate::sync::SyncQueueItem;

/// Response body for GET /cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Current number of entries in the cache
    pub size: usize,
    pub max_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub last_cleared: Option<DateTime<Utc>>,
}

impl CacheStatsResponse {
    pub fn new(stats: &CacheStats, max_entries: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            size: stats.size,
            max_entries,
            hit_rate: stats.hit_rate(),
            last_cleared: stats.last_cleared,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub removed: usize,
}

/// Response body for GET /durable/cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct CachedValueResponse {
    pub key: String,
    pub data: Value,
}

impl CachedValueResponse {
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }
}

/// Result of a fail-soft write. `success` is false when storage refused the
/// operation; the request itself still succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn new(success: bool) -> Self {
        Self { success }
    }
}

/// Response body for GET /collections/:name
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResponse {
    pub name: String,
    pub count: usize,
    pub records: Vec<DurableRecord>,
}

impl CollectionResponse {
    pub fn new(name: impl Into<String>, records: Vec<DurableRecord>) -> Self {
        Self {
            name: name.into(),
            count: records.len(),
            records,
        }
    }
}

/// Response body for GET /sync/queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueResponse {
    pub online: bool,
    pub pending: usize,
    pub items: Vec<SyncQueueItem>,
}

impl QueueResponse {
    pub fn new(online: bool, items: Vec<SyncQueueItem>) -> Self {
        Self {
            online,
            pending: items.len(),
            items,
        }
    }
}

/// Response body for PUT /network
#[derive(Debug, Clone, Serialize)]
pub struct NetworkResponse {
    pub online: bool,
    /// Whether the request flipped the state
    pub changed: bool,
}

/// Response body for GET /metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub count: usize,
    pub capacity: usize,
    pub metrics: Vec<PerformanceMetric>,
}

impl MetricsResponse {
    pub fn new(metrics: Vec<PerformanceMetric>, capacity: usize) -> Self {
        Self {
            count: metrics.len(),
            capacity,
            metrics,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub online: bool,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(online: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            online,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncAction;
    use serde_json::json;

    #[test]
    fn test_cache_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            evictions: 5,
            size: 10,
            last_cleared: None,
        };
        let resp = CacheStatsResponse::new(&stats, 100);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.max_entries, 100);
    }

    #[test]
    fn test_cache_stats_response_zero_requests() {
        let resp = CacheStatsResponse::new(&CacheStats::default(), 100);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_collection_response_counts_records() {
        let resp = CollectionResponse::new(
            "busRoutes",
            vec![DurableRecord::new("r1", json!({})), DurableRecord::new("r2", json!({}))],
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["records"][1]["id"], "r2");
    }

    #[test]
    fn test_queue_response_serialize() {
        let item = SyncQueueItem::new(SyncAction::Update, json!({"id": 4}), Utc::now());
        let json = serde_json::to_value(QueueResponse::new(false, vec![item])).unwrap();
        assert_eq!(json["pending"], 1);
        assert_eq!(json["online"], false);
        assert_eq!(json["items"][0]["action"], "update");
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(true);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
