//! C2 — Service Registry.
//!
//! Publishes `{instance_id, address, port}` records with a lease and offers
//! enumerate/lookup. The real backends this abstracts over are a
//! consensus-style KV with health checks (Consul/etcd-shaped) or a
//! cache-style KV with periodic heartbeat renewal (Redis-shaped); only the
//! in-memory heartbeat-renewal variant ships here, mirroring the way the
//! distributed lock and cross-instance bus are also config-pluggable but
//! in-memory-only in this build.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecordMeta {
    pub machine_id: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service_name: String,
    pub instance_id: Uuid,
    pub address: String,
    pub port: u16,
    pub meta: ServiceRecordMeta,
    #[serde(skip)]
    pub lease_expires_at: Option<DateTime<Utc>>,
}

/// A handle that stops the background heartbeat renewal when dropped or
/// explicitly cancelled.
pub struct KeepAliveHandle {
    cancel: CancellationToken,
}

impl KeepAliveHandle {
    pub fn stop(self) {
        self.cancel.cancel();
    }
}

#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn register(&self, record: ServiceRecord, ttl: Duration) -> anyhow::Result<()>;

    /// Spawns a background task renewing the lease every `heartbeat_period`
    /// until the returned handle is stopped or dropped-and-cancelled.
    async fn keep_alive(
        self: Arc<Self>,
        instance_id: Uuid,
        ttl: Duration,
        heartbeat_period: Duration,
    ) -> KeepAliveHandle;

    async fn deregister(&self, instance_id: Uuid) -> anyhow::Result<()>;

    async fn list(&self, service_name: &str) -> anyhow::Result<Vec<ServiceRecord>>;

    /// Returns the instance currently responsible for `room_id`.
    ///
    /// Current design returns the first listed instance for the service;
    /// this is intentionally unresolved upstream (see the open question on
    /// room->instance affinity) pending a shared `room_id -> instance_id`
    /// mapping. `service_name` scopes the lookup to the fabric's own
    /// instances.
    async fn locate(&self, service_name: &str, room_id: &str) -> anyhow::Result<Option<ServiceRecord>>;
}

struct Entry {
    record: ServiceRecord,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryServiceRegistry {
    records: DashMap<Uuid, Entry>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn renew(&self, instance_id: Uuid, ttl: Duration) -> bool {
        if let Some(mut entry) = self.records.get_mut(&instance_id) {
            entry.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(30));
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryServiceRegistry {
    async fn register(&self, mut record: ServiceRecord, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(30));
        record.lease_expires_at = Some(expires_at);
        self.records.insert(record.instance_id, Entry { record, expires_at });
        Ok(())
    }

    async fn keep_alive(
        self: Arc<Self>,
        instance_id: Uuid,
        ttl: Duration,
        heartbeat_period: Duration,
    ) -> KeepAliveHandle {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat_period);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if !self.renew(instance_id, ttl) {
                            tracing::warn!(%instance_id, "heartbeat renewal found no registry entry; stopping");
                            break;
                        }
                    }
                }
            }
        });
        KeepAliveHandle { cancel }
    }

    async fn deregister(&self, instance_id: Uuid) -> anyhow::Result<()> {
        self.records.remove(&instance_id);
        Ok(())
    }

    async fn list(&self, service_name: &str) -> anyhow::Result<Vec<ServiceRecord>> {
        let now = Utc::now();
        Ok(self
            .records
            .iter()
            .filter(|e| e.expires_at > now && e.record.service_name == service_name)
            .map(|e| e.record.clone())
            .collect())
    }

    async fn locate(&self, service_name: &str, _room_id: &str) -> anyhow::Result<Option<ServiceRecord>> {
        let mut matching = self.list(service_name).await?;
        // Stable first-listed selection; see the open question in
        // SPEC_FULL.md on room->instance affinity for why this isn't smarter.
        matching.sort_by_key(|r| r.instance_id);
        Ok(matching.into_iter().next())
    }
}
