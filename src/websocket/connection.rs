//! Per-client connection: one read task and one write task, both torn
//! down together once either side closes (§5's "one read task + one
//! write task per handle" duplex model).

use crate::error::FabricError;
use crate::hub::{ClientHandle, EgressReceiver};
use crate::protocol::{ClientMessage, Envelope};
use crate::server::GameFabricServer;
use crate::view_filter;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const PING_INTERVAL: Duration = Duration::from_secs(54);
const EGRESS_QUEUE_CAPACITY: usize = 64;

/// Admits the connection into the Hub and spawns its read/write tasks.
/// Returns once both have finished, after releasing the handle.
pub async fn handle_socket(socket: WebSocket, server: Arc<GameFabricServer>, addr: SocketAddr, user_id: Uuid) {
    let handle_id = Uuid::new_v4();
    let handle = ClientHandle {
        id: handle_id,
        user_id,
        remote_addr: addr,
    };

    let egress = match server.hub.accept(handle, EGRESS_QUEUE_CAPACITY).await {
        Ok(egress) => egress,
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "connection rejected at hub admission");
            return;
        }
    };

    send_direct(&server, handle_id, Envelope::new("connected", serde_json::json!({"handle_id": handle_id, "user_id": user_id})));

    let (ws_tx, ws_rx) = socket.split();
    let write_task = tokio::spawn(write_loop(ws_tx, egress, server.config.write_timeout));
    let read_task = tokio::spawn(read_loop(ws_rx, server.clone(), handle_id, user_id, server.config.read_timeout));

    let _ = read_task.await;
    write_task.abort();
    let last_room = server.hub.current_room(handle_id).await;
    server.hub.release(handle_id).await;
    if let Some(room_id) = last_room {
        server.reconnection.register_disconnection(user_id, room_id).await;
    }
    tracing::info!(%user_id, %handle_id, "connection closed");
}

async fn write_loop(mut ws_tx: SplitSink<WebSocket, Message>, mut egress: EgressReceiver, write_timeout: Duration) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;
    loop {
        tokio::select! {
            frame = egress.0.recv() => {
                let Some(frame) = frame else { break };
                if tokio::time::timeout(write_timeout, ws_tx.send(Message::Text(frame.into()))).await.is_err() {
                    tracing::warn!("write timed out; closing connection");
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if tokio::time::timeout(write_timeout, ws_tx.send(Message::Ping(Vec::new().into()))).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = ws_tx.close().await;
}

async fn read_loop(
    mut ws_rx: SplitStream<WebSocket>,
    server: Arc<GameFabricServer>,
    handle_id: Uuid,
    user_id: Uuid,
    read_timeout: Duration,
) {
    loop {
        let next = tokio::time::timeout(read_timeout, ws_rx.next()).await;
        let message = match next {
            Ok(Some(Ok(message))) => message,
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %e, "websocket read error");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::debug!(%user_id, "read timed out");
                break;
            }
        };

        match message {
            Message::Text(text) => dispatch(&server, handle_id, user_id, &text).await,
            Message::Close(_) => break,
            Message::Pong(_) | Message::Ping(_) | Message::Binary(_) => {}
        }
    }
}

async fn dispatch(server: &Arc<GameFabricServer>, handle_id: Uuid, user_id: Uuid, text: &str) {
    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(_) => {
            send_direct(server, handle_id, Envelope::error("unrecognized message"));
            return;
        }
    };

    match client_message {
        ClientMessage::Ping => {
            send_direct(server, handle_id, Envelope::new("pong", serde_json::json!({})));
        }
        ClientMessage::JoinRoom { room_id } => match server.coordinator.join(user_id, &room_id, None).await {
            Ok(room) => {
                server.hub.join_room(handle_id, room_id.clone()).await;
                send_direct(
                    server,
                    handle_id,
                    Envelope::new("room_joined", serde_json::to_value(&room).unwrap_or_default()).with_room(room_id),
                );
            }
            Err(e) => send_direct(server, handle_id, error_envelope(&e)),
        },
        ClientMessage::LeaveRoom => match server.hub.current_room(handle_id).await {
            Some(room_id) => match server.coordinator.leave(user_id, &room_id).await {
                Ok(()) => {
                    server.hub.leave_room(handle_id).await;
                    send_direct(server, handle_id, Envelope::new("room_left", serde_json::json!({"room_id": room_id})));
                }
                Err(e) => send_direct(server, handle_id, error_envelope(&e)),
            },
            None => send_direct(server, handle_id, Envelope::error("not currently in a room")),
        },
        ClientMessage::Reconnect { room_id } => {
            reconnect(server, handle_id, user_id, room_id).await;
        }
        ClientMessage::GetGameState { room_id } => {
            get_game_state(server, handle_id, user_id, room_id).await;
        }
        ClientMessage::PlayCards { .. } | ClientMessage::Pass { .. } => {
            // Game-action resolution does not happen in-duplex: the client
            // is redirected to re-submit the action over the HTTP API,
            // which can take the distributed lock a real resolution needs.
            send_direct(
                server,
                handle_id,
                Envelope::new(
                    "error",
                    serde_json::json!({"code": "use-http-api", "reason": "submit game actions over the HTTP API"}),
                ),
            );
        }
    }
}

async fn reconnect(server: &Arc<GameFabricServer>, handle_id: Uuid, user_id: Uuid, room_id: crate::protocol::RoomId) {
    let last_sequence = match server.reconnection.validate_reconnection(user_id, &room_id).await {
        Ok(last_sequence) => last_sequence,
        Err(e) => {
            send_direct(server, handle_id, error_envelope(&e));
            return;
        }
    };

    match server.coordinator.get_room(&room_id).await {
        Ok(room) => {
            server.hub.join_room(handle_id, room_id.clone()).await;
            let missed_events = server.reconnection.missed_events(&room_id, last_sequence).await;
            let payload = match server.coordinator.get_game_state(&room_id).await {
                Ok(state) => {
                    let filtered = view_filter::filter(&state, user_id);
                    serde_json::json!({ "room": room, "game_state": filtered, "missed_events": missed_events })
                }
                Err(_) => serde_json::json!({ "room": room, "missed_events": missed_events }),
            };
            send_direct(server, handle_id, Envelope::new("game_state_recovery", payload).with_room(room_id));
        }
        Err(e) => send_direct(server, handle_id, error_envelope(&e)),
    }
}

async fn get_game_state(
    server: &Arc<GameFabricServer>,
    handle_id: Uuid,
    _user_id: Uuid,
    room_id: Option<crate::protocol::RoomId>,
) {
    let room_id = match room_id.or(server.hub.current_room(handle_id).await) {
        Some(room_id) => room_id,
        None => {
            send_direct(server, handle_id, Envelope::error("no room specified and none joined"));
            return;
        }
    };
    match server.coordinator.get_game_state(&room_id).await {
        Ok(state) => {
            let filtered = view_filter::filter(&state, _user_id);
            send_direct(
                server,
                handle_id,
                Envelope::new("game_state_update", serde_json::json!({ "game_state": filtered })).with_room(room_id),
            );
        }
        Err(e) => send_direct(server, handle_id, error_envelope(&e)),
    }
}

fn send_direct(server: &Arc<GameFabricServer>, handle_id: Uuid, envelope: Envelope) {
    if let Some(egress) = server.hub.egress_for(handle_id) {
        if let Ok(frame) = serde_json::to_string(&envelope) {
            let _ = egress.try_send(frame);
        }
    }
}

fn error_envelope(e: &FabricError) -> Envelope {
    Envelope::new("error", serde_json::json!({"code": e.code(), "reason": e.reason()}))
}
