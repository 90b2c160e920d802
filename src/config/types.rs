//! Root configuration type.

use super::bus::BusConfig;
use super::cache::CacheConfig;
use super::coordination::CoordinationConfig;
use super::jwt::JwtConfig;
use super::logging::LoggingConfig;
use super::rate_limit::RateLimitConfig;
use super::reconnection::ReconnectionConfig;
use super::server::ServerConfig;
use super::service_discovery::ServiceDiscoveryConfig;
use super::worker_pool::WorkerPoolConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub service_discovery: ServiceDiscoveryConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub coordination: CoordinationConfig,
    #[serde(default)]
    pub worker_pool: WorkerPoolConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
}
