use super::types::{RoomId, RoomStatus, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerGameState {
    pub position: u8,
    /// Alias `cards` on the wire; the raw field name mirrors the data model
    /// in the specification ("private_cards").
    #[serde(rename = "cards")]
    pub private_cards: Vec<u32>,
    pub card_count: u32,
    pub passed: bool,
    pub finished: bool,
    pub rank: Option<u32>,
}

/// Canonical, unfiltered game state. Owned by whichever component last wrote
/// it (the Coordinator, via the rules strategy); never mutated by the Hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub room_id: RoomId,
    pub game_type: String,
    pub status: RoomStatus,
    pub round: u32,
    pub current_player_id: Option<UserId>,
    pub last_cards: Vec<u32>,
    pub last_player_id: Option<UserId>,
    pub pass_count: u32,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub players: HashMap<UserId, PlayerGameState>,
    /// Not serialized outward; present only on the canonical state so the
    /// rules strategy can continue dealing from it.
    #[serde(skip)]
    pub deck: Vec<u32>,
}
