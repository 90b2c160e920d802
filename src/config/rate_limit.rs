//! `rate_limit.*` — sliding-window limits consulted by the Coordinator and
//! the Hub's admission path.

use super::defaults::{
    default_connections_per_ip_per_minute, default_join_attempts_per_minute,
    default_room_creations_per_minute,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_room_creations_per_minute")]
    pub room_creations_per_minute: usize,
    #[serde(default = "default_join_attempts_per_minute")]
    pub join_attempts_per_minute: usize,
    #[serde(default = "default_connections_per_ip_per_minute")]
    pub connections_per_ip_per_minute: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            room_creations_per_minute: default_room_creations_per_minute(),
            join_attempts_per_minute: default_join_attempts_per_minute(),
            connections_per_ip_per_minute: default_connections_per_ip_per_minute(),
        }
    }
}
