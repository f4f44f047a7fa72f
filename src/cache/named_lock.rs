//! # Named Locks
//!
//! One async mutex per key, created on first use and kept for the life of the
//! process. The map itself sits behind a plain mutex that is only held to look
//! up or insert a lock, never across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Default)]
pub struct NamedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NamedLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for `key`
    ///
    /// The returned lock is shared with every other caller using the same key.
    pub fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        // A panic while holding the map lock cannot leave the map half-updated
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(key) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(key.to_string(), Arc::clone(&lock));
        lock
    }

    /// Number of keys a lock has been created for
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
