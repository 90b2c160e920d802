use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier produced by the token verifier (C1) at connect time.
pub type UserId = Uuid;

/// Short prefixed token assigned by the Coordinator on `create`, e.g.
/// `room_7f3a2c`. Kept as a plain `String` rather than a `Uuid` because it is
/// player-facing (shown in room codes/links).
pub type RoomId = String;

pub const ROOM_ID_PREFIX: &str = "room_";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InGame,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerInfo {
    pub user_id: UserId,
    pub uid: String,
    pub nickname: String,
    pub avatar: String,
    pub position: u8,
    pub ready: bool,
}
