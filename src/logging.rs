//! Structured logging initialization.
//!
//! Selects a human-readable (ANSI) or JSON `tracing-subscriber` layer driven
//! by `logging.level` (an `env-filter` directive string) and `logging.format`,
//! with optional daily-rolling file output via `tracing-appender` when
//! `logging.file_path` is set.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt::time::UtcTime, layer::Identity, prelude::*};

pub fn init_with_config(cfg: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_new(&cfg.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match cfg.format.as_str() {
        "json" => init_json_logging(cfg, env_filter),
        _ => init_text_logging(cfg, env_filter),
    }
}

fn init_json_logging(cfg: &LoggingConfig, env_filter: tracing_subscriber::EnvFilter) {
    let registry = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout),
    );

    if let Some(file_layer) = build_file_layer(cfg, |writer| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(writer)
    }) {
        let _ = registry.with(file_layer).try_init();
        return;
    }
    let _ = registry.with(Identity::new()).try_init();
}

fn init_text_logging(cfg: &LoggingConfig, env_filter: tracing_subscriber::EnvFilter) {
    let registry = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout),
    );

    if let Some(file_layer) = build_file_layer(cfg, |writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(writer)
    }) {
        let _ = registry.with(file_layer).try_init();
        return;
    }
    let _ = registry.with(Identity::new()).try_init();
}

fn build_file_layer<F, L>(cfg: &LoggingConfig, build_layer: F) -> Option<L>
where
    F: FnOnce(tracing_appender::non_blocking::NonBlocking) -> L,
{
    let dir = cfg.file_path.as_ref()?;
    if std::fs::create_dir_all(dir).is_err() {
        eprintln!("Failed to create log directory '{dir}', continuing with stdout logs");
        return None;
    }

    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        dir,
        "game-fabric-server.log",
    );
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
    let _leaked: &'static _ = Box::leak(Box::new(file_guard));
    Some(build_layer(non_blocking))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_directive_falls_back_to_info() {
        let cfg = LoggingConfig {
            level: "not a valid directive!!".to_string(),
            format: "text".to_string(),
            file_path: None,
        };
        let env_filter = tracing_subscriber::EnvFilter::try_new(&cfg.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        assert_eq!(env_filter.to_string(), "info");
    }
}
