//! API Module
//!
//! HTTP diagnostics surface over the offline core.
//!
//! # Endpoints
//! - `GET /health` - Health check with current reachability
//! - `GET /cache/stats`, `DELETE /cache?pattern=` - Memory cache
//! - `PUT /durable/cache`, `GET|DELETE /durable/cache/:key` - Durable cache
//! - `PUT|GET /collections/:name`, `GET /storage/stats` - Durable collections
//! - `POST /sync/enqueue`, `GET /sync/queue`, `POST /sync/drain` - Sync queue
//! - `PUT /network` - Reachability signal
//! - `GET|DELETE /metrics` - Metric samples

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
