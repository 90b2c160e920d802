//! C8 — Broadcaster.
//!
//! Resolves a logical envelope to a target set of local handles, serializes
//! it once, and delivers it through each target's egress queue without
//! blocking on a slow or gone peer. Mirrors room/lobby/direct envelopes onto
//! the Cross-Instance Bus so peer instances can deliver to members they own.

use crate::bus::{record_for, CrossInstanceBus, TOPIC_BROADCAST_ALL};
use crate::hub::ConnectionHub;
use crate::protocol::LogicalMessage;
use crate::reconnection::ReconnectionManager;
use smallvec::SmallVec;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Typical room size; rooms bigger than this still work, they just spill
/// onto the heap like any other `SmallVec`.
const TYPICAL_ROOM_SIZE: usize = 8;
const PARALLEL_DELIVERY_THRESHOLD: usize = 100;
const DEFAULT_PARALLEL_SEMAPHORE: usize = 50;

pub type HandleIdList = SmallVec<[crate::hub::HandleId; TYPICAL_ROOM_SIZE]>;

pub struct Broadcaster {
    hub: Arc<ConnectionHub>,
    bus: Arc<dyn CrossInstanceBus>,
    instance_id: Uuid,
    reconnection: Arc<ReconnectionManager>,
    parallel_semaphore: Arc<Semaphore>,
    delivered: std::sync::atomic::AtomicU64,
    dropped: std::sync::atomic::AtomicU64,
}

impl Broadcaster {
    pub fn new(
        hub: Arc<ConnectionHub>,
        bus: Arc<dyn CrossInstanceBus>,
        instance_id: Uuid,
        reconnection: Arc<ReconnectionManager>,
    ) -> Self {
        Self {
            hub,
            bus,
            instance_id,
            reconnection,
            parallel_semaphore: Arc::new(Semaphore::new(DEFAULT_PARALLEL_SEMAPHORE)),
            delivered: std::sync::atomic::AtomicU64::new(0),
            dropped: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// `(delivered, dropped)` lifetime counters and current in-flight
    /// parallel-delivery pressure, surfaced at `/metrics`.
    pub fn counters(&self) -> (u64, u64, usize) {
        (
            self.delivered.load(std::sync::atomic::Ordering::Relaxed),
            self.dropped.load(std::sync::atomic::Ordering::Relaxed),
            DEFAULT_PARALLEL_SEMAPHORE.saturating_sub(self.parallel_semaphore.available_permits()),
        )
    }

    /// Resolves, serializes and delivers `message` to every local target,
    /// then mirrors it to the cross-instance bus. `local_only` skips the bus
    /// mirror — used when replaying a record *received from* the bus, so it
    /// isn't re-published and re-delivered in a loop.
    pub async fn publish(&self, message: LogicalMessage, local_only: bool) -> anyhow::Result<usize> {
        let targets = self.resolve_targets(&message).await;
        let envelope = message.to_envelope();
        let frame = serde_json::to_string(&envelope)?;

        if let Some(room_id) = message.room_id.as_ref().filter(|r| !r.is_empty()) {
            self.reconnection.buffer_event(room_id, envelope).await;
        }

        let delivered = self.deliver(&targets, frame).await;

        if !local_only {
            let record = record_for(
                message.r#type.clone(),
                message.room_id.clone(),
                self.instance_id,
                serde_json::json!({
                    "room_id": message.room_id,
                    "user_id": message.user_id,
                    "payload": message.payload,
                }),
            );
            if let Err(e) = self.bus.publish(TOPIC_BROADCAST_ALL, record).await {
                // Infrastructure failure is downgraded locally: local
                // delivery already happened above.
                tracing::warn!(error = %e, "cross-instance mirror failed; local delivery already completed");
            }
        }
        Ok(delivered)
    }

    async fn resolve_targets(&self, message: &LogicalMessage) -> HandleIdList {
        if let Some(room_id) = message.room_id.as_ref().filter(|r| !r.is_empty()) {
            self.hub.list_room(room_id).await.into_iter().collect()
        } else if let Some(user_id) = message.user_id {
            match self.hub.lookup_user(user_id).await {
                Some(handle_id) => SmallVec::from_elem(handle_id, 1),
                None => SmallVec::new(),
            }
        } else {
            self.hub.list_all_handles().await.into_iter().collect()
        }
    }

    async fn deliver(&self, targets: &HandleIdList, frame: String) -> usize {
        let delivered = if targets.len() < PARALLEL_DELIVERY_THRESHOLD {
            let mut delivered = 0;
            for &handle_id in targets.iter() {
                if deliver_one(&self.hub, handle_id, &frame) {
                    delivered += 1;
                }
            }
            delivered
        } else {
            let mut handles = Vec::with_capacity(targets.len());
            for &handle_id in targets.iter() {
                let sem = self.parallel_semaphore.clone();
                let hub = self.hub.clone();
                let frame = frame.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = sem.acquire_owned().await.ok();
                    deliver_one(&hub, handle_id, &frame)
                }));
            }
            let mut delivered = 0;
            for h in handles {
                if h.await.unwrap_or(false) {
                    delivered += 1;
                }
            }
            delivered
        };
        self.delivered
            .fetch_add(delivered as u64, std::sync::atomic::Ordering::Relaxed);
        self.dropped.fetch_add(
            (targets.len() - delivered) as u64,
            std::sync::atomic::Ordering::Relaxed,
        );
        delivered
    }
}

/// Non-blocking push to one handle's egress; a full queue forces that
/// session closed rather than letting a slow peer block every producer.
/// `hub` is always reached through an `Arc` so the spawned release task can
/// outlive this call.
fn deliver_one(hub: &Arc<ConnectionHub>, handle_id: crate::hub::HandleId, frame: &str) -> bool {
    match hub.egress_for(handle_id) {
        Some(egress) => match egress.try_send(frame.to_string()) {
            Ok(()) => true,
            Err(()) => {
                let hub = hub.clone();
                tokio::spawn(async move {
                    hub.release(handle_id).await;
                });
                false
            }
        },
        None => false,
    }
}
