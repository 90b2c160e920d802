//! C5 — Distributed Lock.
//!
//! Named mutual-exclusion leases with TTL and owner fencing. The in-memory
//! backend below is what actually runs; the `DistributedLock` trait is the
//! seam a consensus-store-backed implementation (etcd/Consul-style) would
//! slot into without touching callers.

use crate::retry::{RetryConfig, RetryExecutor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LockHandle {
    pub key: String,
    pub token: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
struct LockEntry {
    token: Uuid,
    expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Blocks (with backoff) until the lock is acquired or `wait` elapses.
    async fn acquire(&self, key: &str, ttl: Duration, wait: Duration) -> anyhow::Result<LockHandle>;

    /// Acquires without retrying; returns `Ok(None)` if already held.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<LockHandle>>;

    async fn extend(&self, handle: &LockHandle, ttl: Duration) -> anyhow::Result<bool>;

    async fn release(&self, handle: &LockHandle) -> anyhow::Result<()>;

    async fn is_locked(&self, key: &str) -> anyhow::Result<bool>;
}

#[derive(Default)]
pub struct InMemoryDistributedLock {
    locks: Arc<RwLock<HashMap<String, LockEntry>>>,
}

impl InMemoryDistributedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops expired entries and inserts the new one in a single write-lock
    /// critical section so a "check then insert" race can't slip a second
    /// owner in between the two steps.
    async fn try_insert(&self, key: &str, ttl: Duration) -> Option<LockHandle> {
        let now = Utc::now();
        let mut locks = self.locks.write().await;
        if let Some(existing) = locks.get(key) {
            if existing.expires_at > now {
                return None;
            }
        }
        let token = Uuid::new_v4();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(30));
        locks.insert(
            key.to_string(),
            LockEntry {
                token,
                expires_at,
            },
        );
        Some(LockHandle {
            key: key.to_string(),
            token,
            acquired_at: now,
            ttl,
        })
    }

    pub async fn cleanup_expired_locks(&self) -> usize {
        let now = Utc::now();
        let mut locks = self.locks.write().await;
        let before = locks.len();
        locks.retain(|_, entry| entry.expires_at > now);
        before - locks.len()
    }
}

#[async_trait]
impl DistributedLock for InMemoryDistributedLock {
    async fn acquire(&self, key: &str, ttl: Duration, wait: Duration) -> anyhow::Result<LockHandle> {
        let executor = RetryExecutor::new(RetryConfig::persistent());
        let deadline = tokio::time::Instant::now() + wait;
        executor
            .execute_with_condition(
                || async {
                    if let Some(handle) = self.try_insert(key, ttl).await {
                        Ok(handle)
                    } else {
                        Err(anyhow::anyhow!("lock busy: {key}"))
                    }
                },
                |_| tokio::time::Instant::now() < deadline,
            )
            .await
    }

    async fn try_acquire(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<LockHandle>> {
        Ok(self.try_insert(key, ttl).await)
    }

    async fn extend(&self, handle: &LockHandle, ttl: Duration) -> anyhow::Result<bool> {
        let mut locks = self.locks.write().await;
        match locks.get_mut(&handle.key) {
            Some(entry) if entry.token == handle.token => {
                entry.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(30));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, handle: &LockHandle) -> anyhow::Result<()> {
        let mut locks = self.locks.write().await;
        if let Some(entry) = locks.get(&handle.key) {
            if entry.token == handle.token {
                locks.remove(&handle.key);
            }
        }
        Ok(())
    }

    async fn is_locked(&self, key: &str) -> anyhow::Result<bool> {
        let now = Utc::now();
        let locks = self.locks.read().await;
        Ok(locks.get(key).map(|e| e.expires_at > now).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn try_acquire_then_busy() {
        let lock = InMemoryDistributedLock::new();
        let h1 = lock
            .try_acquire("room:abc:start", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(h1.is_some());
        let h2 = lock
            .try_acquire("room:abc:start", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(h2.is_none());
    }

    #[tokio::test]
    async fn release_allows_reacquire() {
        let lock = InMemoryDistributedLock::new();
        let h1 = lock
            .try_acquire("k", Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();
        lock.release(&h1).await.unwrap();
        let h2 = lock.try_acquire("k", Duration::from_secs(10)).await.unwrap();
        assert!(h2.is_some());
    }

    #[tokio::test]
    async fn only_owner_can_release() {
        let lock = InMemoryDistributedLock::new();
        let h1 = lock
            .try_acquire("k", Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();
        let forged = LockHandle {
            key: "k".into(),
            token: Uuid::new_v4(),
            acquired_at: Utc::now(),
            ttl: Duration::from_secs(10),
        };
        lock.release(&forged).await.unwrap();
        assert!(lock.is_locked("k").await.unwrap());
        lock.release(&h1).await.unwrap();
        assert!(!lock.is_locked("k").await.unwrap());
    }

    #[tokio::test]
    async fn expired_lock_is_reacquirable() {
        let lock = InMemoryDistributedLock::new();
        let _h1 = lock
            .try_acquire("k", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let h2 = lock.try_acquire("k", Duration::from_secs(10)).await.unwrap();
        assert!(h2.is_some());
    }

    #[tokio::test]
    async fn concurrent_start_race_exactly_one_winner() {
        let lock = Arc::new(InMemoryDistributedLock::new());
        let mut handles = Vec::new();
        for _ in 0..10 {
            let lock = lock.clone();
            handles.push(tokio::spawn(async move {
                lock.try_acquire("room:R:start", Duration::from_secs(10))
                    .await
                    .unwrap()
                    .is_some()
            }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
