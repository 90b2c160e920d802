//! Client<->Hub duplex protocol (§6): JSON text frames. Inbound frames are
//! modeled as a tagged enum (validated at the edge); outbound frames are the
//! free-form envelope the wire actually carries — typed constructors below
//! keep call sites from hand-assembling JSON.

use super::types::{RoomId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinRoom { room_id: RoomId },
    LeaveRoom,
    Ping,
    Reconnect { room_id: RoomId },
    PlayCards {
        #[serde(default)]
        room_id: Option<RoomId>,
        cards: Vec<u32>,
    },
    Pass {
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    GetGameState {
        #[serde(default)]
        room_id: Option<RoomId>,
    },
}

/// Server-initiated frame: `{type, room_id?, user_id?, raw_data}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub raw_data: serde_json::Value,
}

impl Envelope {
    pub fn new(r#type: impl Into<String>, raw_data: serde_json::Value) -> Self {
        Self {
            r#type: r#type.into(),
            room_id: None,
            user_id: None,
            raw_data,
        }
    }

    pub fn with_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::new("error", serde_json::json!({ "reason": reason.into() }))
    }
}

/// A logical message handed to the Broadcaster before resolution/delivery:
/// `{type, room_id?, user_id?, payload}` (§4.2).
#[derive(Debug, Clone)]
pub struct LogicalMessage {
    pub r#type: String,
    pub room_id: Option<RoomId>,
    pub user_id: Option<UserId>,
    pub payload: serde_json::Value,
}

impl LogicalMessage {
    pub fn to_envelope(&self) -> Envelope {
        let mut env = Envelope::new(self.r#type.clone(), self.payload.clone());
        env.room_id = self.room_id.clone();
        env.user_id = self.user_id;
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_room() {
        let raw = r#"{"type":"join_room","room_id":"room_abc"}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(msg, ClientMessage::JoinRoom { room_id } if room_id == "room_abc"));
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let raw = r#"{"type":"teleport"}"#;
        let msg: Result<ClientMessage, _> = serde_json::from_str(raw);
        assert!(msg.is_err());
    }

    #[test]
    fn envelope_serializes_expected_shape() {
        let env = Envelope::new("room_created", serde_json::json!({"room_id": "room_abc"}));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["type"], "room_created");
        assert!(value.get("room_id").is_none());
    }
}
