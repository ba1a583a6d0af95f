use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async locks used to serialize logical operations that span several
/// repository calls: append+reveal and leave+reconcile take the room lock,
/// direct-room find-or-create takes the sorted-pair lock.
///
/// Entries are created on first use and kept for the process lifetime; the
/// map is bounded by the set of rooms and user pairs this instance touches.
#[derive(Clone, Default)]
pub struct KeyedLocks<K: Eq + Hash + Clone> {
    inner: Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            map.entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Normalizes an unordered user pair into a stable lock key.
pub fn pair_key(a: uuid::Uuid, b: uuid::Uuid) -> (uuid::Uuid, uuid::Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
