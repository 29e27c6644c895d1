//! Sync queue items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::durable::DurableRecord;

/// Kind of mutation waiting to be replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

/// A mutation queued while it could not (or should not) be applied directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// UUIDv7: time-ordered, so sorting by id follows enqueue order
    pub id: String,
    pub action: SyncAction,
    pub payload: Value,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
}

impl SyncQueueItem {
    pub fn new(action: SyncAction, payload: Value, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            action,
            payload,
            enqueued_at,
            retry_count: 0,
        }
    }

    pub fn to_record(&self) -> Result<DurableRecord, serde_json::Error> {
        Ok(DurableRecord::new(self.id.clone(), serde_json::to_value(self)?))
    }

    pub fn from_record(record: DurableRecord) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_item_has_unique_id() {
        let now = Utc::now();
        let a = SyncQueueItem::new(SyncAction::Create, json!({}), now);
        let b = SyncQueueItem::new(SyncAction::Create, json!({}), now);

        assert_ne!(a.id, b.id);
        assert_eq!(a.retry_count, 0);
    }

    #[test]
    fn test_ids_sort_in_creation_order() {
        let now = Utc::now();
        let ids: Vec<String> = (0..50)
            .map(|_| SyncQueueItem::new(SyncAction::Update, json!(null), now).id)
            .collect();

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_action_serializes_lowercase() {
        assert_eq!(serde_json::to_value(SyncAction::Delete).unwrap(), json!("delete"));
        let action: SyncAction = serde_json::from_value(json!("create")).unwrap();
        assert_eq!(action, SyncAction::Create);
    }

    #[test]
    fn test_record_conversion() {
        let item = SyncQueueItem::new(SyncAction::Update, json!({"id": 7}), Utc::now());

        let record = item.to_record().unwrap();
        assert_eq!(record.id, item.id);
        assert_eq!(SyncQueueItem::from_record(record).unwrap(), item);
    }
}
