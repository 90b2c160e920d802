//! `service_discovery.*` — Service Registry (C2) tuning.

use super::defaults::{
    default_deregister_after_secs, default_health_check_address, default_health_check_interval_secs,
    default_health_check_timeout_secs, default_heartbeat_interval_secs, default_instance_ttl_secs,
    default_service_discovery_enabled, default_service_discovery_type,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceDiscoveryConfig {
    #[serde(default = "default_service_discovery_enabled")]
    pub enabled: bool,
    /// Backend selector; only `"in-memory"` is implemented, mirroring the
    /// config-pluggable/runtime-in-memory pattern used by the bus and lock.
    #[serde(default = "default_service_discovery_type")]
    pub r#type: String,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,
    #[serde(default = "default_deregister_after_secs")]
    pub deregister_after_secs: u64,
    #[serde(default = "default_instance_ttl_secs")]
    pub instance_ttl_secs: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_health_check_address")]
    pub health_check_address: String,
}

impl Default for ServiceDiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_service_discovery_enabled(),
            r#type: default_service_discovery_type(),
            health_check_interval_secs: default_health_check_interval_secs(),
            health_check_timeout_secs: default_health_check_timeout_secs(),
            deregister_after_secs: default_deregister_after_secs(),
            instance_ttl_secs: default_instance_ttl_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            health_check_address: default_health_check_address(),
        }
    }
}
