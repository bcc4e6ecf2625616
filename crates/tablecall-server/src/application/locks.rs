//! Per-call serialization within one process
//!
//! Deliveries for the same provider call run one at a time; different calls
//! never wait on each other. Entries are dropped once no task holds or
//! waits on them. Across instances the repository's revision guard is what
//! keeps writes ordered.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct CallLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held for the duration of one delivery
pub struct CallLockGuard<'a> {
    owner: &'a CallLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CallLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, provider_call_id: &str) -> CallLockGuard<'_> {
        let lock = self
            .locks
            .entry(provider_call_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        CallLockGuard {
            owner: self,
            key: provider_call_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Calls with a live lock entry
    pub fn active_calls(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for CallLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's own reference left: nobody holds or waits on it.
        self.owner
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
