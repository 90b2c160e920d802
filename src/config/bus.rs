//! `bus.*` — Cross-Instance Bus (C3) tuning.
//!
//! Fields mirror a Kafka-shaped broker config because that is the backend
//! §9's open question on consumer-group naming assumes; only the in-memory
//! broadcast-channel backend actually ships (see [`crate::bus`]).

use super::defaults::{
    default_batch_size, default_bus_brokers, default_bus_channel_capacity, default_bus_enabled,
    default_compression_type, default_consumer_auto_commit, default_consumer_group,
    default_consumer_max_poll_records, default_fetch_max_wait_ms, default_fetch_min_bytes,
    default_linger_ms, default_producer_acks, default_producer_retries, default_topic_prefix,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BusConfig {
    #[serde(default = "default_bus_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bus_brokers")]
    pub brokers: Vec<String>,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    #[serde(default = "default_producer_acks")]
    pub producer_acks: String,
    #[serde(default = "default_producer_retries")]
    pub producer_retries: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
    #[serde(default = "default_compression_type")]
    pub compression_type: String,
    #[serde(default = "default_consumer_auto_commit")]
    pub consumer_auto_commit: bool,
    #[serde(default = "default_consumer_max_poll_records")]
    pub consumer_max_poll_records: usize,
    #[serde(default = "default_fetch_min_bytes")]
    pub fetch_min_bytes: usize,
    #[serde(default = "default_fetch_max_wait_ms")]
    pub fetch_max_wait_ms: u64,
    /// Capacity of the in-memory backend's per-topic broadcast channel; not
    /// part of the original enumerated config, added because the in-memory
    /// implementation needs it where a real broker wouldn't.
    #[serde(default = "default_bus_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enabled: default_bus_enabled(),
            brokers: default_bus_brokers(),
            topic_prefix: default_topic_prefix(),
            consumer_group: default_consumer_group(),
            producer_acks: default_producer_acks(),
            producer_retries: default_producer_retries(),
            batch_size: default_batch_size(),
            linger_ms: default_linger_ms(),
            compression_type: default_compression_type(),
            consumer_auto_commit: default_consumer_auto_commit(),
            consumer_max_poll_records: default_consumer_max_poll_records(),
            fetch_min_bytes: default_fetch_min_bytes(),
            fetch_max_wait_ms: default_fetch_max_wait_ms(),
            channel_capacity: default_bus_channel_capacity(),
        }
    }
}
