//! Network Module
//!
//! Reachability signal supplied by the hosting environment. The current state
//! lives in a `watch` channel so any task can read it or wait for the next
//! online/offline transition.

use tokio::sync::watch;
use tracing::info;

#[derive(Debug)]
pub struct NetworkMonitor {
    tx: watch::Sender<bool>,
}

impl NetworkMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records the current reachability. Subscribers are only woken when the
    /// value actually changes.
    ///
    /// Returns `true` when this call was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "network reachability changed");
        }
        changed
    }

    /// Receiver that observes every future transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
