//! C3 — Cross-Instance Bus.
//!
//! Publish/subscribe of typed envelopes keyed by topic, with a per-instance
//! subscriber group so every live instance receives every message (at the
//! cost of self-echoes the caller must filter). The config surface
//! (`bus.{brokers, consumer_group, ...}`) describes a Kafka-shaped broker;
//! nothing in this corpus depends on a real broker client, so — as with the
//! distributed lock and service registry — only the in-memory transport
//! ships, grounded on the same "config describes a pluggable backend,
//! runtime is in-memory" shape used throughout this fabric.

use crate::retry::{RetryConfig, RetryExecutor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// The well-known topic carrying Broadcaster mirrors.
pub const TOPIC_BROADCAST_ALL: &str = "broadcast-all";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusRecord {
    pub r#type: String,
    /// Plain `RoomId` string (e.g. `room_7f3a2c`) — player-facing room codes
    /// are never valid UUIDs, so this is carried as-is rather than parsed.
    pub room_id: Option<String>,
    pub source_instance: Uuid,
    pub timestamp: DateTime<Utc>,
    pub sequence: Option<u64>,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait CrossInstanceBus: Send + Sync {
    async fn publish(&self, topic: &str, record: BusRecord) -> anyhow::Result<()>;

    /// Subscribes to `topic`. The returned receiver yields every record not
    /// authored by `self_instance` — self-echoes are filtered here so every
    /// caller gets the same semantics without re-deriving the filter.
    fn subscribe(&self, topic: &str, self_instance: Uuid) -> broadcast::Receiver<BusRecord>;

    async fn close(&self) -> anyhow::Result<()>;

    /// `(published, consumed)` lifetime counters, surfaced at `/metrics`.
    fn counters(&self) -> (u64, u64);
}

struct TopicChannel {
    sender: broadcast::Sender<BusRecord>,
}

/// In-memory pub/sub keyed by topic name (optionally prefixed). Each
/// instance process holds one bus; "every instance receives every message"
/// falls out naturally here because a single `tokio::sync::broadcast`
/// channel fans out to every subscriber — the self-echo filter at
/// `subscribe` is what gives it the "own subscriber group" semantics the
/// external contract describes.
pub struct InMemoryCrossInstanceBus {
    topics: dashmap::DashMap<String, TopicChannel>,
    topic_prefix: String,
    sequence: std::sync::atomic::AtomicU64,
    capacity: usize,
    published: std::sync::atomic::AtomicU64,
    consumed: Arc<std::sync::atomic::AtomicU64>,
}

impl InMemoryCrossInstanceBus {
    pub fn new(topic_prefix: impl Into<String>, capacity: usize) -> Self {
        Self {
            topics: dashmap::DashMap::new(),
            topic_prefix: topic_prefix.into(),
            sequence: std::sync::atomic::AtomicU64::new(0),
            capacity,
            published: std::sync::atomic::AtomicU64::new(0),
            consumed: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    fn full_topic(&self, topic: &str) -> String {
        if self.topic_prefix.is_empty() {
            topic.to_string()
        } else {
            format!("{}{}", self.topic_prefix, topic)
        }
    }

    fn channel(&self, topic: &str) -> broadcast::Sender<BusRecord> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicChannel {
                sender: broadcast::channel(self.capacity).0,
            })
            .sender
            .clone()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CrossInstanceBus for InMemoryCrossInstanceBus {
    async fn publish(&self, topic: &str, mut record: BusRecord) -> anyhow::Result<()> {
        record.sequence.get_or_insert_with(|| self.next_sequence());
        let full_topic = self.full_topic(topic);
        let sender = self.channel(&full_topic);
        self.published.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let executor = RetryExecutor::new(RetryConfig::bus());
        executor
            .execute(|| {
                let sender = sender.clone();
                let record = record.clone();
                async move {
                    // `send` only fails when there are zero subscribers, which
                    // is not a transient broker condition worth retrying —
                    // treat it as success since at-least-once delivery has
                    // nothing to deliver to yet.
                    let _ = sender.send(record);
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await
    }

    fn subscribe(&self, topic: &str, self_instance: Uuid) -> broadcast::Receiver<BusRecord> {
        let full_topic = self.full_topic(topic);
        let sender = self.channel(&full_topic);
        let mut rx = sender.subscribe();
        let (filtered_tx, filtered_rx) = broadcast::channel(self.capacity);
        let consumed = self.consumed.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(record) => {
                        if record.source_instance != self_instance {
                            consumed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                            let _ = filtered_tx.send(record);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "cross-instance bus consumer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        filtered_rx
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.topics.clear();
        Ok(())
    }

    fn counters(&self) -> (u64, u64) {
        (
            self.published.load(std::sync::atomic::Ordering::Relaxed),
            self.consumed.load(std::sync::atomic::Ordering::Relaxed),
        )
    }
}

pub fn record_for(
    envelope_type: impl Into<String>,
    room_id: Option<String>,
    source_instance: Uuid,
    data: serde_json::Value,
) -> BusRecord {
    BusRecord {
        r#type: envelope_type.into(),
        room_id,
        source_instance,
        timestamp: Utc::now(),
        sequence: None,
        data,
    }
}
