//! Top-level server object wiring every component (identity verifier,
//! connection hub, broadcaster, coordinator, service registry, worker
//! pool, rate limiting, metrics) into one `Arc`-shared handle the
//! websocket layer dispatches against.

use crate::auth::TokenVerifier;
use crate::broadcast::Broadcaster;
use crate::bus::{CrossInstanceBus, InMemoryCrossInstanceBus, TOPIC_BROADCAST_ALL};
use crate::config::Config;
use crate::coordinator::RoomCoordinator;
use crate::distributed::{DistributedLock, InMemoryDistributedLock};
use crate::hub::ConnectionHub;
use crate::metrics::ServerMetrics;
use crate::protocol::LogicalMessage;
use crate::rate_limit::FabricRateLimits;
use crate::reconnection::ReconnectionManager;
use crate::registry::{
    InMemoryServiceRegistry, KeepAliveHandle, ServiceRecord, ServiceRecordMeta, ServiceRegistry,
};
use crate::rules::RulesRegistry;
use crate::store::{CacheMirror, InMemoryCacheMirror, InMemoryRoomStore, RoomStore};
use crate::worker_pool::WorkerPool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

pub const SERVICE_NAME: &str = "game-fabric";

/// How often the reconnection grace-window sweep drops stale entries.
const RECONNECTION_CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

/// Flattened, behavior-tuning projection of [`Config`] — the fields
/// `GameFabricServer` and the websocket layer consult directly, with
/// durations already converted out of the raw `_secs` config fields.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub admin_port: u16,
    pub mode: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub machine_id: String,
    pub health_check_address: String,
    pub instance_ttl: Duration,
    pub heartbeat_interval: Duration,
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.server.port,
            admin_port: config.server.admin_port,
            mode: config.server.mode.clone(),
            read_timeout: Duration::from_secs(config.server.read_timeout_secs),
            write_timeout: Duration::from_secs(config.server.write_timeout_secs),
            machine_id: config.server.machine_id.clone(),
            health_check_address: config.service_discovery.health_check_address.clone(),
            instance_ttl: Duration::from_secs(config.service_discovery.instance_ttl_secs),
            heartbeat_interval: Duration::from_secs(config.service_discovery.heartbeat_interval_secs),
            shutdown_grace: Duration::from_secs(config.worker_pool.task_timeout_secs),
        }
    }
}

pub struct GameFabricServer {
    pub hub: Arc<ConnectionHub>,
    pub bus: Arc<dyn CrossInstanceBus>,
    pub broadcaster: Arc<Broadcaster>,
    pub reconnection: Arc<ReconnectionManager>,
    pub coordinator: Arc<RoomCoordinator>,
    pub registry: Arc<dyn ServiceRegistry>,
    pub worker_pool: Arc<WorkerPool>,
    pub token_verifier: Arc<TokenVerifier>,
    pub rate_limits: Arc<FabricRateLimits>,
    pub metrics: Arc<ServerMetrics>,
    pub config: ServerConfig,
    pub instance_id: Uuid,
    keep_alive: Mutex<Option<KeepAliveHandle>>,
}

impl GameFabricServer {
    /// Validates the loaded config, then instantiates every in-memory
    /// backend and wires the Room Lifecycle Coordinator on top of them.
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        crate::config::validate_config_security(&config)?;

        let instance_id = Uuid::new_v4();
        let server_config = ServerConfig::from_config(&config);

        let hub = Arc::new(ConnectionHub::new(
            config.coordination.register_workers,
            config.coordination.register_queue_capacity,
        ));
        let bus: Arc<dyn CrossInstanceBus> = Arc::new(InMemoryCrossInstanceBus::new(
            config.bus.topic_prefix.clone(),
            config.bus.channel_capacity,
        ));
        let metrics = Arc::new(ServerMetrics::new());
        let reconnection = Arc::new(ReconnectionManager::new(
            config.reconnection.grace_window_secs,
            config.reconnection.event_buffer_size,
            metrics.clone(),
        ));
        let broadcaster = Arc::new(Broadcaster::new(hub.clone(), bus.clone(), instance_id, reconnection.clone()));

        let store: Arc<dyn RoomStore> = Arc::new(InMemoryRoomStore::new());
        let cache: Arc<dyn CacheMirror> = Arc::new(InMemoryCacheMirror::new());
        let distributed_lock: Arc<dyn DistributedLock> = Arc::new(InMemoryDistributedLock::new());
        let registry: Arc<dyn ServiceRegistry> = Arc::new(InMemoryServiceRegistry::new());
        let worker_pool = Arc::new(WorkerPool::new(
            config.worker_pool.workers,
            config.worker_pool.queue_capacity,
            Duration::from_secs(config.worker_pool.task_timeout_secs),
        ));
        let rules = Arc::new(RulesRegistry::default());
        let rate_limits = Arc::new(FabricRateLimits::new(
            config.rate_limit.room_creations_per_minute,
            config.rate_limit.join_attempts_per_minute,
            config.rate_limit.connections_per_ip_per_minute,
        ));
        let token_verifier = Arc::new(TokenVerifier::new(config.jwt.secret.clone().into_bytes()));

        let coordinator = Arc::new(RoomCoordinator::new(
            store,
            cache,
            distributed_lock,
            registry.clone(),
            worker_pool.clone(),
            rules,
            rate_limits.clone(),
            metrics.clone(),
            SERVICE_NAME,
        ));

        spawn_bus_relay(bus.clone(), broadcaster.clone(), instance_id);
        spawn_reconnection_sweep(reconnection.clone());

        Ok(Arc::new(Self {
            hub,
            bus,
            broadcaster,
            reconnection,
            coordinator,
            registry,
            worker_pool,
            token_verifier,
            rate_limits,
            metrics,
            config: server_config,
            instance_id,
            keep_alive: Mutex::new(None),
        }))
    }

    /// Publishes this instance's `ServiceRecord` and starts the heartbeat
    /// keep-alive loop that renews its lease.
    pub async fn register(&self) -> anyhow::Result<()> {
        let record = ServiceRecord {
            service_name: SERVICE_NAME.to_string(),
            instance_id: self.instance_id,
            address: self.config.health_check_address.clone(),
            port: self.config.port,
            meta: ServiceRecordMeta {
                machine_id: self.config.machine_id.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            lease_expires_at: None,
        };
        self.registry.register(record, self.config.instance_ttl).await?;
        let handle = self
            .registry
            .clone()
            .keep_alive(self.instance_id, self.config.instance_ttl, self.config.heartbeat_interval)
            .await;
        *self.keep_alive.lock().expect("keep-alive mutex poisoned") = Some(handle);
        Ok(())
    }

    /// Stops the heartbeat, deregisters this instance, drains the worker
    /// pool and closes the bus — in that order, so a peer never sees this
    /// instance listed after its in-flight notify work has been abandoned.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.keep_alive.lock().expect("keep-alive mutex poisoned").take() {
            handle.stop();
        }
        if let Err(e) = self.registry.deregister(self.instance_id).await {
            tracing::warn!(error = %e, "failed to deregister instance on shutdown");
        }
        self.worker_pool.shutdown(self.config.shutdown_grace).await;
        if let Err(e) = self.bus.close().await {
            tracing::warn!(error = %e, "failed to close cross-instance bus on shutdown");
        }
    }
}

/// Subscribes to the bus's `broadcast-all` topic and re-delivers every
/// record authored by a peer instance through the local Broadcaster, so a
/// room member connected here sees envelopes that originated elsewhere
/// (S5/S6). `local_only: true` on the replay keeps it from being mirrored
/// straight back onto the bus.
fn spawn_bus_relay(bus: Arc<dyn CrossInstanceBus>, broadcaster: Arc<Broadcaster>, instance_id: Uuid) {
    let mut rx = bus.subscribe(TOPIC_BROADCAST_ALL, instance_id);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(record) => {
                    let message = LogicalMessage {
                        r#type: record.r#type,
                        room_id: record.data.get("room_id").and_then(|v| v.as_str()).map(String::from),
                        user_id: record
                            .data
                            .get("user_id")
                            .and_then(|v| v.as_str())
                            .and_then(|s| Uuid::parse_str(s).ok()),
                        payload: record.data.get("payload").cloned().unwrap_or_default(),
                    };
                    if let Err(e) = broadcaster.publish(message, true).await {
                        tracing::warn!(error = %e, "failed to relay cross-instance bus record locally");
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "cross-instance bus relay lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Periodically drops reconnection grace-window entries nobody redeemed.
fn spawn_reconnection_sweep(reconnection: Arc<ReconnectionManager>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RECONNECTION_CLEANUP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let dropped = reconnection.cleanup_expired().await;
            if dropped > 0 {
                tracing::debug!(dropped, "swept expired reconnection entries");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_wires_every_component_and_register_roundtrips() {
        let mut config = Config::default();
        config.jwt.secret = "test-secret-at-least-16-bytes".into();
        let server = GameFabricServer::new(config).await.unwrap();
        server.register().await.unwrap();

        let listed = server.registry.list(SERVICE_NAME).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].instance_id, server.instance_id);

        server.shutdown().await;
        let listed = server.registry.list(SERVICE_NAME).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn new_rejects_empty_jwt_secret_in_production() {
        let mut config = Config::default();
        config.server.mode = "production".into();
        config.jwt.secret = String::new();
        assert!(GameFabricServer::new(config).await.is_err());
    }
}
