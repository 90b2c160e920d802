//! Ambient metrics surface.
//!
//! A minimal counters/gauges snapshot exposed at `/metrics` (JSON) for
//! operational visibility: connections, rooms, broadcast delivery, worker
//! pool depth and bus publish/consume counts. Present as ambient
//! observability infrastructure, independent of which product features are
//! in scope.

use crate::broadcast::Broadcaster;
use crate::bus::CrossInstanceBus;
use crate::hub::ConnectionHub;
use crate::worker_pool::WorkerPool;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub rooms_created: AtomicU64,
    pub rooms_deleted: AtomicU64,
    pub joins: AtomicU64,
    pub leaves: AtomicU64,
    pub games_started: AtomicU64,
    pub notify_failures: AtomicU64,
    pub rate_limit_rejections: AtomicU64,
    pub reconnection_tokens_issued: AtomicU64,
    pub reconnections_completed: AtomicU64,
    pub reconnection_failures: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_deleted(&self) {
        self.rooms_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_joins(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_leaves(&self) {
        self.leaves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_games_started(&self) {
        self.games_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notify_failures(&self) {
        self.notify_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limit_rejections(&self) {
        self.rate_limit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconnection_tokens_issued(&self) {
        self.reconnection_tokens_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconnections_completed(&self) {
        self.reconnections_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconnection_failures(&self) {
        self.reconnection_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Assembles the `/metrics` payload from this instance's own counters
    /// plus live gauges read off the components that already track their
    /// own depth (worker pool queue, broadcaster in-flight parallel
    /// delivery, bus publish/consume totals, hub connection/room counts).
    pub async fn snapshot(
        &self,
        hub: &ConnectionHub,
        broadcaster: &Broadcaster,
        worker_pool: &WorkerPool,
        bus: &dyn CrossInstanceBus,
    ) -> MetricsSnapshot {
        let (connections, rooms) = hub.counts().await;
        let (broadcast_delivered, broadcast_dropped, broadcast_in_flight) = broadcaster.counters();
        let (bus_published, bus_consumed) = bus.counters();
        let pool_counters = worker_pool.counters();

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics { active: connections as u64 },
            rooms: RoomMetrics {
                active: rooms as u64,
                created: self.rooms_created.load(Ordering::Relaxed),
                deleted: self.rooms_deleted.load(Ordering::Relaxed),
                joins: self.joins.load(Ordering::Relaxed),
                leaves: self.leaves.load(Ordering::Relaxed),
                games_started: self.games_started.load(Ordering::Relaxed),
            },
            broadcast: BroadcastMetrics {
                delivered: broadcast_delivered,
                dropped: broadcast_dropped,
                parallel_delivery_in_flight: broadcast_in_flight as u64,
            },
            worker_pool: WorkerPoolMetrics {
                queue_depth: pool_counters.queue_depth.load(Ordering::SeqCst) as u64,
                queue_capacity: worker_pool.capacity() as u64,
                submitted: pool_counters.total.load(Ordering::SeqCst),
                succeeded: pool_counters.success.load(Ordering::SeqCst),
                failed: pool_counters.failed.load(Ordering::SeqCst),
            },
            bus: BusMetrics {
                published: bus_published,
                consumed: bus_consumed,
            },
            rate_limiting: RateLimitingMetrics {
                rejections: self.rate_limit_rejections.load(Ordering::Relaxed),
            },
            reconnection: ReconnectionMetrics {
                tokens_issued: self.reconnection_tokens_issued.load(Ordering::Relaxed),
                completed: self.reconnections_completed.load(Ordering::Relaxed),
                failed: self.reconnection_failures.load(Ordering::Relaxed),
            },
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub rooms: RoomMetrics,
    pub broadcast: BroadcastMetrics,
    pub worker_pool: WorkerPoolMetrics,
    pub bus: BusMetrics,
    pub rate_limiting: RateLimitingMetrics,
    pub reconnection: ReconnectionMetrics,
    pub notify_failures: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionMetrics {
    pub active: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoomMetrics {
    pub active: u64,
    pub created: u64,
    pub deleted: u64,
    pub joins: u64,
    pub leaves: u64,
    pub games_started: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BroadcastMetrics {
    pub delivered: u64,
    pub dropped: u64,
    pub parallel_delivery_in_flight: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkerPoolMetrics {
    pub queue_depth: u64,
    pub queue_capacity: u64,
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BusMetrics {
    pub published: u64,
    pub consumed: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitingMetrics {
    pub rejections: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReconnectionMetrics {
    pub tokens_issued: u64,
    pub completed: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryCrossInstanceBus;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn snapshot_reflects_counters_and_live_gauges() {
        let metrics = ServerMetrics::new();
        metrics.increment_rooms_created();
        metrics.increment_joins();
        metrics.increment_joins();

        let hub = std::sync::Arc::new(ConnectionHub::new(2, 64));
        let bus: std::sync::Arc<dyn CrossInstanceBus> =
            std::sync::Arc::new(InMemoryCrossInstanceBus::new("", 32));
        let reconnection = std::sync::Arc::new(crate::reconnection::ReconnectionManager::new(
            30,
            50,
            std::sync::Arc::new(ServerMetrics::new()),
        ));
        let broadcaster = Broadcaster::new(hub.clone(), bus.clone(), Uuid::new_v4(), reconnection);
        let worker_pool = WorkerPool::new(1, 8, Duration::from_secs(1));

        let snapshot = metrics
            .snapshot(&hub, &broadcaster, &worker_pool, bus.as_ref())
            .await;

        assert_eq!(snapshot.rooms.created, 1);
        assert_eq!(snapshot.rooms.joins, 2);
        assert_eq!(snapshot.worker_pool.queue_capacity, 8);
        assert_eq!(snapshot.bus.published, 0);
    }
}
