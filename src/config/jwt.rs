//! `jwt.*` — Identity & Token Verifier (C1) settings.

use super::defaults::default_jwt_expiration_secs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtConfig {
    /// HMAC signing secret; validated non-empty and non-default outside
    /// `server.mode = "dev"` by [`super::validation::validate_config_security`].
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_jwt_expiration_secs")]
    pub expiration_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expiration_secs: default_jwt_expiration_secs(),
        }
    }
}
