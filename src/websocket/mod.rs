//! Axum router assembly: the public `/ws` upgrade, the internal
//! `/internal/room/notify` sidecar endpoint, and a couple of ops
//! endpoints (`/health`, `/metrics`).

pub mod connection;
pub mod handler;
pub mod notify;

use crate::server::GameFabricServer;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<GameFabricServer>> {
    Router::new()
        .route("/ws", get(handler::websocket_handler))
        .route("/internal/room/notify", post(notify::notify_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
}

async fn health_check() -> &'static str {
    "ok"
}

async fn metrics_handler(
    State(server): State<Arc<GameFabricServer>>,
) -> Json<crate::metrics::MetricsSnapshot> {
    let snapshot = server
        .metrics
        .snapshot(&server.hub, &server.broadcaster, &server.worker_pool, server.bus.as_ref())
        .await;
    Json(snapshot)
}
