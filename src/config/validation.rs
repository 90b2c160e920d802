//! Configuration validation functions.

use super::Config;

/// Hard-failure validation for insecure defaults outside `server.mode =
/// "dev"`. `load()` only warns on this; `main.rs`'s `--validate-config` and
/// normal startup both call this and propagate the error.
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    let is_prod = is_production_mode(config);

    if is_prod && config.jwt.secret.trim().is_empty() {
        anyhow::bail!(
            "jwt.secret must be set outside dev mode; generate one with `openssl rand -hex 32` \
             and set GAME_FABRIC__JWT__SECRET"
        );
    }
    if is_prod && config.jwt.secret.len() < 16 {
        eprintln!(
            "WARNING: jwt.secret is very short ({} chars); recommend at least 32",
            config.jwt.secret.len()
        );
    }
    if config.coordination.lock_ttl_seconds == 0 {
        anyhow::bail!("coordination.lock_ttl_seconds must be greater than zero");
    }
    if config.worker_pool.workers == 0 {
        anyhow::bail!("worker_pool.workers must be greater than zero");
    }
    Ok(())
}

fn is_production_mode(config: &Config) -> bool {
    config.server.mode.eq_ignore_ascii_case("production") || config.server.mode.eq_ignore_ascii_case("prod")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_mode_allows_empty_secret() {
        let config = Config::default();
        assert!(validate_config_security(&config).is_ok());
    }

    #[test]
    fn production_mode_rejects_empty_secret() {
        let mut config = Config::default();
        config.server.mode = "production".to_string();
        assert!(validate_config_security(&config).is_err());
    }

    #[test]
    fn production_mode_accepts_configured_secret() {
        let mut config = Config::default();
        config.server.mode = "production".to_string();
        config.jwt.secret = "a-sufficiently-long-shared-secret".to_string();
        assert!(validate_config_security(&config).is_ok());
    }
}
