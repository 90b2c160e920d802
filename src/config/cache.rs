//! `cache.*` — best-effort `CacheMirror` backend settings.

use super::defaults::{default_cache_db, default_cache_host, default_cache_pool_size, default_cache_port};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_host")]
    pub host: String,
    #[serde(default = "default_cache_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_cache_db")]
    pub db: u32,
    #[serde(default = "default_cache_pool_size")]
    pub pool_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: default_cache_host(),
            port: default_cache_port(),
            password: None,
            db: default_cache_db(),
            pool_size: default_cache_pool_size(),
        }
    }
}
