//! Request DTOs for the diagnostics API

use serde::Deserialize;
use serde_json::Value;

use crate::durable::DurableRecord;
use crate::sync::SyncAction;

const MAX_KEY_LEN: usize = 256;

fn validate_key(what: &str, key: &str) -> Option<String> {
    if key.is_empty() {
        return Some(format!("{what} cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Some(format!(
            "{what} exceeds maximum length of {MAX_KEY_LEN} characters"
        ));
    }
    None
}

/// Request body for PUT /durable/cache
#[derive(Debug, Clone, Deserialize)]
pub struct DurableCacheRequest {
    pub key: String,
    pub data: Value,
    /// Uses the configured durable TTL when absent
    #[serde(default)]
    pub ttl_minutes: Option<u64>,
}

impl DurableCacheRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.ttl_minutes == Some(0) {
            return Some("ttl_minutes must be positive".to_string());
        }
        validate_key("Key", &self.key)
    }
}

/// Request body for PUT /collections/:name. Replaces the whole collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionRequest {
    pub records: Vec<DurableRecord>,
}

impl CollectionRequest {
    pub fn validate(&self) -> Option<String> {
        self.records
            .iter()
            .find_map(|record| validate_key("Record id", &record.id))
    }
}

/// Request body for POST /sync/enqueue
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueRequest {
    pub action: SyncAction,
    #[serde(default)]
    pub payload: Value,
}

/// Request body for PUT /network
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NetworkRequest {
    pub online: bool,
}

/// Query string of DELETE /cache. A missing or empty pattern clears everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateQuery {
    #[serde(default)]
    pub pattern: Option<String>,
}
