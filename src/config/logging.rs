//! `logging.*` — ambient structured-logging configuration.

use super::defaults::{default_log_file_path, default_log_format, default_log_level};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// `env-filter` directive string, e.g. `"info,game_fabric_server=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `"text"` (ANSI, dev) or `"json"` (prod).
    #[serde(default = "default_log_format")]
    pub format: String,
    /// When set, logs additionally roll daily into this directory via
    /// `tracing-appender`.
    #[serde(default = "default_log_file_path")]
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file_path: default_log_file_path(),
        }
    }
}
