//! `worker_pool.*` — Bounded Worker Pool (C4) sizing.

use super::defaults::{
    default_worker_pool_queue_capacity, default_worker_pool_task_timeout_secs,
    default_worker_pool_workers,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkerPoolConfig {
    #[serde(default = "default_worker_pool_workers")]
    pub workers: usize,
    #[serde(default = "default_worker_pool_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_worker_pool_task_timeout_secs")]
    pub task_timeout_secs: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: default_worker_pool_workers(),
            queue_capacity: default_worker_pool_queue_capacity(),
            task_timeout_secs: default_worker_pool_task_timeout_secs(),
        }
    }
}
