//! Background Tasks Module
//!
//! Long-running tasks spawned by the server.
//!
//! # Tasks
//! - Durable cleanup: deletes expired durable cache items at a fixed interval
//! - Sync worker: drains the sync queue on demand and on reconnect

mod cleanup;
mod sync_worker;

pub use cleanup::spawn_cleanup_task;
pub use sync_worker::spawn_sync_worker;
