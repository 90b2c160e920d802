//! `coordination.*` — ambient tuning for the Hub's admission workers and the
//! Broadcaster's delivery strategy, and the Coordinator's start lock TTL.

use super::defaults::{
    default_broadcast_workers, default_lock_ttl_seconds, default_notify_timeout_seconds,
    default_parallel_delivery_semaphore, default_parallel_delivery_threshold,
    default_register_queue_capacity, default_register_workers,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoordinationConfig {
    #[serde(default = "default_register_workers")]
    pub register_workers: usize,
    #[serde(default = "default_register_queue_capacity")]
    pub register_queue_capacity: usize,
    #[serde(default = "default_broadcast_workers")]
    pub broadcast_workers: usize,
    #[serde(default = "default_parallel_delivery_threshold")]
    pub parallel_delivery_threshold: usize,
    #[serde(default = "default_parallel_delivery_semaphore")]
    pub parallel_delivery_semaphore: usize,
    #[serde(default = "default_lock_ttl_seconds")]
    pub lock_ttl_seconds: u64,
    #[serde(default = "default_notify_timeout_seconds")]
    pub notify_timeout_seconds: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            register_workers: default_register_workers(),
            register_queue_capacity: default_register_queue_capacity(),
            broadcast_workers: default_broadcast_workers(),
            parallel_delivery_threshold: default_parallel_delivery_threshold(),
            parallel_delivery_semaphore: default_parallel_delivery_semaphore(),
            lock_ttl_seconds: default_lock_ttl_seconds(),
            notify_timeout_seconds: default_notify_timeout_seconds(),
        }
    }
}
