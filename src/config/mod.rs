//! Configuration module for the game fabric server.
//!
//! Supports:
//! - JSON configuration files
//! - Environment variable overrides
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`types`]: Root `Config` struct
//! - [`server`]: Listen address, mode, per-connection timeouts
//! - [`service_discovery`]: Service Registry (C2) tuning
//! - [`bus`]: Cross-Instance Bus (C3) tuning
//! - [`cache`]: `CacheMirror` backend settings
//! - [`jwt`]: Identity & Token Verifier (C1) settings
//! - [`logging`]: Ambient structured-logging configuration
//! - [`coordination`]: Hub admission / Broadcaster / Coordinator lock tuning
//! - [`worker_pool`]: Bounded Worker Pool (C4) sizing
//! - [`rate_limit`]: Sliding-window limits
//! - [`reconnection`]: Reconnection-token grace window / replay buffer sizing
//! - [`loader`]: Configuration loading functions
//! - [`validation`]: Configuration validation functions
//! - [`defaults`]: Default value functions

pub mod bus;
pub mod cache;
pub mod coordination;
pub mod defaults;
pub mod jwt;
pub mod loader;
pub mod logging;
pub mod rate_limit;
pub mod reconnection;
pub mod server;
pub mod service_discovery;
pub mod types;
pub mod validation;
pub mod worker_pool;

pub use bus::BusConfig;
pub use cache::CacheConfig;
pub use coordination::CoordinationConfig;
pub use jwt::JwtConfig;
pub use loader::load;
pub use logging::LoggingConfig;
pub use rate_limit::RateLimitConfig;
pub use reconnection::ReconnectionConfig;
pub use server::ServerConfig;
pub use service_discovery::ServiceDiscoveryConfig;
pub use types::Config;
pub use validation::validate_config_security;
pub use worker_pool::WorkerPoolConfig;
