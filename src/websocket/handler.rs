//! WebSocket upgrade handler.
//!
//! Auth happens here, before the upgrade completes: a missing or invalid
//! bearer token rejects the request outright rather than negotiating
//! further over the duplex, per the connect contract in §6.

use crate::auth::extract_token;
use crate::error::FabricError;
use crate::server::GameFabricServer;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<GameFabricServer>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Response {
    if !server.rate_limits.connections_per_ip.check(&addr.ip()) {
        server.metrics.increment_rate_limit_rejections();
        return FabricError::Unavailable("too many connections from this address".into()).into_response();
    }

    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = extract_token(query.token.as_deref(), auth_header);

    let user_id = match token.and_then(|t| server.token_verifier.verify(t).ok()) {
        Some(user_id) => user_id,
        None => {
            return FabricError::Unauthenticated("missing or invalid token".into()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, server, addr, user_id))
}
