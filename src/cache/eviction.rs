//! Eviction Tracker Module
//!
//! Chooses which key leaves the memory cache once it is full.

use std::collections::VecDeque;
use std::str::FromStr;

// == Eviction Policy ==
/// How the victim is picked when a new key arrives at capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Oldest-inserted key goes first. Reads never change the order.
    #[default]
    InsertionOrder,
    /// Least recently read or written key goes first.
    LeastRecentlyUsed,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    /// Accepts `insertion_order`/`fifo` and `least_recently_used`/`lru`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insertion_order" | "fifo" => Ok(Self::InsertionOrder),
            "least_recently_used" | "lru" => Ok(Self::LeastRecentlyUsed),
            other => Err(format!("unknown eviction policy: {other}")),
        }
    }
}

// == Eviction Tracker ==
/// Tracks key order for eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Newest (inserted or, under LRU, most recently used)
/// - Back = Next eviction candidate
#[derive(Debug, Default)]
pub struct EvictionTracker {
    policy: EvictionPolicy,
    order: VecDeque<String>,
}

impl EvictionTracker {
    // == Constructor ==
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            order: VecDeque::new(),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    // == Record Insert ==
    /// Registers a write of `key`.
    ///
    /// A brand new key goes to the front. Overwriting an existing key keeps
    /// its position under insertion order and refreshes it under LRU.
    pub fn record_insert(&mut self, key: &str) {
        if self.contains(key) {
            if self.policy == EvictionPolicy::LeastRecentlyUsed {
                self.move_to_front(key);
            }
            return;
        }
        self.order.push_front(key.to_string());
    }

    // == Record Access ==
    /// Registers a successful read of `key`. Only LRU cares.
    pub fn record_access(&mut self, key: &str) {
        if self.policy == EvictionPolicy::LeastRecentlyUsed && self.contains(key) {
            self.move_to_front(key);
        }
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the next eviction candidate.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }

    fn move_to_front(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_new() {
        let tracker = EvictionTracker::new(EvictionPolicy::InsertionOrder);
        assert!(tracker.is_empty());
        assert_eq!(tracker.len(), 0);
        assert_eq!(tracker.policy(), EvictionPolicy::InsertionOrder);
    }

    #[test]
    fn test_insertion_order_evicts_first_inserted() {
        let mut tracker = EvictionTracker::new(EvictionPolicy::InsertionOrder);

        tracker.record_insert("a");
        tracker.record_insert("b");
        tracker.record_insert("c");

        assert_eq!(tracker.evict_oldest(), Some("a".to_string()));
        assert_eq!(tracker.evict_oldest(), Some("b".to_string()));
        assert_eq!(tracker.evict_oldest(), Some("c".to_string()));
        assert_eq!(tracker.evict_oldest(), None);
    }

    #[test]
    fn test_insertion_order_ignores_reads() {
        let mut tracker = EvictionTracker::new(EvictionPolicy::InsertionOrder);

        tracker.record_insert("a");
        tracker.record_insert("b");
        tracker.record_access("a");

        // Reading "a" does not save it: this is FIFO, not true LRU
        assert_eq!(tracker.evict_oldest(), Some("a".to_string()));
    }

    #[test]
    fn test_insertion_order_overwrite_keeps_position() {
        let mut tracker = EvictionTracker::new(EvictionPolicy::InsertionOrder);

        tracker.record_insert("a");
        tracker.record_insert("b");
        tracker.record_insert("a");

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.evict_oldest(), Some("a".to_string()));
    }

    #[test]
    fn test_lru_access_moves_to_front() {
        let mut tracker = EvictionTracker::new(EvictionPolicy::LeastRecentlyUsed);

        tracker.record_insert("a");
        tracker.record_insert("b");
        tracker.record_insert("c");
        tracker.record_access("a");

        assert_eq!(tracker.evict_oldest(), Some("b".to_string()));
        assert_eq!(tracker.evict_oldest(), Some("c".to_string()));
        assert_eq!(tracker.evict_oldest(), Some("a".to_string()));
    }

    #[test]
    fn test_lru_overwrite_refreshes() {
        let mut tracker = EvictionTracker::new(EvictionPolicy::LeastRecentlyUsed);

        tracker.record_insert("a");
        tracker.record_insert("b");
        tracker.record_insert("a");

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.evict_oldest(), Some("b".to_string()));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("lru".parse(), Ok(EvictionPolicy::LeastRecentlyUsed));
        assert_eq!(
            " Least_Recently_Used ".parse(),
            Ok(EvictionPolicy::LeastRecentlyUsed)
        );
        assert_eq!("insertion_order".parse(), Ok(EvictionPolicy::InsertionOrder));
        assert_eq!("fifo".parse(), Ok(EvictionPolicy::InsertionOrder));
        assert!("random".parse::<EvictionPolicy>().is_err());
    }

    #[test]
    fn test_access_unknown_key_is_noop() {
        let mut tracker = EvictionTracker::new(EvictionPolicy::LeastRecentlyUsed);
        tracker.record_access("ghost");
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut tracker = EvictionTracker::new(EvictionPolicy::InsertionOrder);

        tracker.record_insert("key1");
        tracker.record_insert("key2");
        tracker.record_insert("key3");
        tracker.remove("key2");
        tracker.remove("nonexistent");

        assert_eq!(tracker.len(), 2);
        assert!(!tracker.contains("key2"));

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
