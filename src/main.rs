#![cfg_attr(not(test), deny(clippy::panic))]

use axum::Router;
use clap::Parser;
use game_fabric_server::server::GameFabricServer;
use game_fabric_server::{config, logging, websocket};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Realtime connection, room and cross-instance broadcast fabric for an
/// online card-game platform.
#[derive(Parser, Debug)]
#[command(name = "game-fabric-server")]
#[command(about = "Realtime game-session fabric: connections, rooms, broadcast and cross-instance coordination")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config_security(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.server.port);
                println!("  Admin port: {}", cfg.server.admin_port);
                println!("  Mode: {}", cfg.server.mode);
                println!("  Worker pool workers: {}", cfg.worker_pool.workers);
                println!("  Coordination lock TTL (s): {}", cfg.coordination.lock_ttl_seconds);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }
    validation_result?;

    logging::init_with_config(&cfg.logging);

    let port = cfg.server.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "starting game fabric server");

    let server = GameFabricServer::new(cfg).await?;
    server.register().await?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app: Router = websocket::router()
        .with_state(server.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "game fabric server listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    server.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn default_no_flags() {
        let cli = Cli::try_parse_from(["game-fabric-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn validate_config_flags() {
        let cli = Cli::try_parse_from(["game-fabric-server", "--validate-config"]).unwrap();
        assert!(cli.validate_config);
        let cli = Cli::try_parse_from(["game-fabric-server", "-c"]).unwrap();
        assert!(cli.validate_config);
    }

    #[test]
    fn print_config_flag() {
        let cli = Cli::try_parse_from(["game-fabric-server", "--print-config"]).unwrap();
        assert!(cli.print_config);
    }

    #[test]
    fn flags_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["game-fabric-server", "--validate-config", "--print-config"]);
        assert!(result.is_err());
    }
}
