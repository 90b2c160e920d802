//! C6 — Local RW Lock Map.
//!
//! A keyed lock service: acquiring key `K` for write takes a per-key mutex
//! without contending with unrelated keys. This is the "RW-lock over a map"
//! pattern generalized into its own component rather than re-derived ad hoc
//! at every call site that needs per-room single-writer discipline.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-key mutexes. Keys are created lazily on first access and
/// never removed — the table grows with the set of distinct keys ever seen
/// (room ids churn, but the `Arc<Mutex<()>>` entries are small).
pub struct RwLockMap<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for RwLockMap<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RwLockMap<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn entry_for(&self, key: &K) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquires the write lock for `key`, blocking until available. Returns
    /// an owned guard so callers can hold it across `.await` points and move
    /// it into spawned tasks without fighting the map's lifetime.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        self.entry_for(key).lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let map: RwLockMap<String> = RwLockMap::new();
        let g1 = map.lock(&"room-a".to_string()).await;
        // A different key should acquire immediately even while "room-a" is held.
        let fut = map.lock(&"room-b".to_string());
        let result = tokio::time::timeout(Duration::from_millis(50), fut).await;
        assert!(result.is_ok());
        drop(g1);
    }

    #[tokio::test]
    async fn same_key_serializes() {
        let map = Arc::new(RwLockMap::<String>::new());
        let counter = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let map = map.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _g = map.lock(&"room-x".to_string()).await;
                let before = counter.load(Ordering::SeqCst);
                tokio::task::yield_now().await;
                counter.store(before + 1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }
}
