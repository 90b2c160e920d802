//! Shared scaffolding for integration tests: a `GameFabricServer` wired up
//! with permissive rate limits so tests can hammer it without tripping the
//! sliding-window limiters the production defaults enforce.

use game_fabric_server::config::Config;
use game_fabric_server::server::GameFabricServer;
use std::sync::Arc;

#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = "test-only-secret-not-for-production-use".to_string();
    config.rate_limit.room_creations_per_minute = 10_000;
    config.rate_limit.join_attempts_per_minute = 10_000;
    config.rate_limit.connections_per_ip_per_minute = 10_000;
    config
}

#[allow(dead_code)]
pub async fn create_test_server() -> Arc<GameFabricServer> {
    create_test_server_with_config(test_config()).await
}

#[allow(dead_code)]
pub async fn create_test_server_with_config(config: Config) -> Arc<GameFabricServer> {
    GameFabricServer::new(config)
        .await
        .expect("test server should assemble from a valid config")
}
