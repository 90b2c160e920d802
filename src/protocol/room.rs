use super::types::{PlayerInfo, RoomId, RoomStatus, UserId};
use crate::error::{FabricError, FabricResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use base64::Engine;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub game_type: String,
    pub room_type: String,
    pub base_bet: u64,
    pub max_players: u8,
    pub current_players: u8,
    pub status: RoomStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub creator_id: UserId,
    pub players: Vec<PlayerInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub game_type: String,
    pub room_type: String,
    pub base_bet: u64,
    pub max_players: u8,
    #[serde(default)]
    pub password: Option<String>,
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use subtle::ConstantTimeEq;
    hash_password(password).as_bytes().ct_eq(hash.as_bytes()).into()
}

pub fn validate_create_request(req: &CreateRoomRequest) -> FabricResult<()> {
    if req.game_type.trim().is_empty() {
        return Err(FabricError::InvalidArgument("game_type must not be empty".into()));
    }
    if req.room_type.trim().is_empty() {
        return Err(FabricError::InvalidArgument("room_type must not be empty".into()));
    }
    if !(2..=10).contains(&req.max_players) {
        return Err(FabricError::InvalidArgument(
            "max_players must be between 2 and 10".into(),
        ));
    }
    Ok(())
}

impl Room {
    /// Renumbers `players` positions to 1..n without gaps (I6) and keeps
    /// `current_players` in lockstep with `players.len()` (I4).
    pub fn recompute_positions(&mut self) {
        for (idx, player) in self.players.iter_mut().enumerate() {
            player.position = (idx + 1) as u8;
        }
        self.current_players = self.players.len() as u8;
    }

    pub fn find_player(&self, user_id: UserId) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn find_player_mut(&mut self, user_id: UserId) -> Option<&mut PlayerInfo> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.ready)
    }

    /// (I7) a room with zero players does not exist; callers must delete the
    /// persisted record instead of retaining an empty one.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Debug/test invariant check covering I4-I7.
    #[cfg(any(test, feature = "invariant-checks"))]
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.current_players as usize != self.players.len() {
            return Err("I4 violated: current_players != players.len()".into());
        }
        if self.current_players > self.max_players {
            return Err("I5 violated: current_players > max_players".into());
        }
        let mut positions: Vec<u8> = self.players.iter().map(|p| p.position).collect();
        positions.sort_unstable();
        let expected: Vec<u8> = (1..=positions.len() as u8).collect();
        if positions != expected {
            return Err("I6 violated: positions are not 1..n without gaps".into());
        }
        if self.players.is_empty() {
            return Err("I7 violated: room exists with zero players".into());
        }
        Ok(())
    }
}
