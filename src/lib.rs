//! Offline Core - offline data and caching layer
//!
//! TTL/version-aware memory cache, durable collection store, offline sync
//! queue with bounded retries, and an in-process metric recorder, exposed
//! through a small diagnostics HTTP API.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod durable;
pub mod error;
pub mod metrics;
pub mod models;
pub mod network;
pub mod query;
pub mod sync;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use tasks::{spawn_cleanup_task, spawn_sync_worker};
