//! `POST /internal/room/notify` — the sidecar the Coordinator's outbox
//! calls on whichever instance currently owns a room's connections (per
//! the Service Registry's `locate`), translated here into Broadcaster
//! envelope(s) delivered to locally-connected clients only.

use crate::coordinator::{NotifyAction, NotifyBody};
use crate::protocol::LogicalMessage;
use crate::server::GameFabricServer;
use crate::view_filter;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

pub async fn notify_handler(State(server): State<Arc<GameFabricServer>>, Json(body): Json<NotifyBody>) -> StatusCode {
    for message in to_logical_messages(&server, body).await {
        // Not `local_only`: a room's members can be split across instances
        // (the Service Registry only records which instance the Coordinator
        // notified, not where every member's socket lives), so this needs to
        // reach the bus for peer instances to redeliver to members they own.
        if let Err(e) = server.broadcaster.publish(message, false).await {
            tracing::warn!(error = %e, "failed to deliver notify fanout locally");
        }
    }
    StatusCode::OK
}

async fn to_logical_messages(server: &Arc<GameFabricServer>, body: NotifyBody) -> Vec<LogicalMessage> {
    let NotifyBody { room_id, action, user_id, room_data } = body;
    match action {
        NotifyAction::RoomCreated => vec![LogicalMessage {
            r#type: "room_created".into(),
            room_id: None,
            user_id: None,
            payload: room_data.unwrap_or_default(),
        }],
        NotifyAction::RoomDeleted => vec![LogicalMessage {
            r#type: "room_deleted".into(),
            room_id: None,
            user_id: None,
            payload: room_data.unwrap_or_else(|| serde_json::json!({"room_id": room_id})),
        }],
        NotifyAction::Join => vec![update_message(&room_id, user_id, "join", room_data)],
        NotifyAction::Leave => vec![update_message(&room_id, user_id, "leave", room_data)],
        NotifyAction::Ready => vec![update_message(&room_id, user_id, "ready", room_data)],
        NotifyAction::CancelReady => vec![update_message(&room_id, user_id, "cancel_ready", room_data)],
        NotifyAction::GameStarted => game_state_fanout(server, "game_started", &room_id, room_data).await,
        NotifyAction::GameStateUpdate => game_state_fanout(server, "game_state_update", &room_id, room_data).await,
        NotifyAction::GameEnd => game_state_fanout(server, "game_end", &room_id, room_data).await,
        NotifyAction::TimerStart => vec![LogicalMessage {
            r#type: "timer_start".into(),
            room_id: Some(room_id),
            user_id: None,
            payload: room_data.unwrap_or_default(),
        }],
        NotifyAction::TimerStop => vec![LogicalMessage {
            r#type: "timer_stop".into(),
            room_id: Some(room_id),
            user_id: None,
            payload: room_data.unwrap_or_default(),
        }],
    }
}

fn update_message(room_id: &str, user_id: Uuid, action: &str, room_data: Option<serde_json::Value>) -> LogicalMessage {
    LogicalMessage {
        r#type: "room_updated".into(),
        room_id: Some(room_id.to_string()),
        user_id: None,
        payload: serde_json::json!({
            "action": action,
            "user_id": user_id,
            "room_data": room_data,
        }),
    }
}

/// `game_started`/`game_state_update`/`game_end` fan out a room-wide
/// envelope plus one filtered per-player envelope, since the raw
/// `GameState` in `room_data` must not reach clients as-is (§4.5).
async fn game_state_fanout(
    server: &Arc<GameFabricServer>,
    envelope_type: &str,
    room_id: &str,
    room_data: Option<serde_json::Value>,
) -> Vec<LogicalMessage> {
    let mut messages = vec![LogicalMessage {
        r#type: envelope_type.into(),
        room_id: Some(room_id.to_string()),
        user_id: None,
        payload: room_data.unwrap_or_default(),
    }];

    if let Ok(state) = server.coordinator.get_game_state(room_id).await {
        for &user_id in state.players.keys() {
            let filtered = view_filter::filter(&state, user_id);
            messages.push(LogicalMessage {
                r#type: envelope_type.into(),
                room_id: None,
                user_id: Some(user_id),
                payload: serde_json::json!({ "game_state": filtered }),
            });
        }
    }
    messages
}
