//! `server.*` — listen address, mode, and per-connection timeouts.

use super::defaults::{
    default_admin_port, default_machine_id, default_mode, default_port,
    default_read_timeout_secs, default_write_timeout_secs,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,
    /// `"dev"` or `"production"`; gates the startup security checks in
    /// [`super::validation::validate_config_security`].
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
    #[serde(default = "default_machine_id")]
    pub machine_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            admin_port: default_admin_port(),
            mode: default_mode(),
            read_timeout_secs: default_read_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            machine_id: default_machine_id(),
        }
    }
}
