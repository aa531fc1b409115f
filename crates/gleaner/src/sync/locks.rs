use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::types::TargetKind;

type Key = (TargetKind, Uuid);

/// Keyed async mutexes, one per sync target.
///
/// Serializes passes over the same entity when an event is delivered twice or
/// a manual sync overlaps the daemon. Different targets never contend.
#[derive(Default)]
pub struct TargetLocks {
    locks: Mutex<HashMap<Key, Arc<tokio::sync::Mutex<()>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a target.
    pub async fn acquire(&self, kind: TargetKind, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only the map refers to are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry((kind, id)).or_default())
        };
        lock.lock_owned().await
    }

    /// Whether a pass currently holds (or waits for) the target.
    pub fn is_locked(&self, kind: TargetKind, id: Uuid) -> bool {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind, id))
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}
