//! Request and Response models for the diagnostics API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    CollectionRequest, DurableCacheRequest, EnqueueRequest, InvalidateQuery, NetworkRequest,
};
pub use responses::{
    CacheStatsResponse, CachedValueResponse, CollectionResponse, ErrorResponse, HealthResponse,
    InvalidateResponse, MetricsResponse, NetworkResponse, QueueResponse, SuccessResponse,
};
