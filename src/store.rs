//! Room and game-state persistence.
//!
//! The specification's ownership summary draws a line between the
//! authoritative store (single-writer per `room_id`, enforced upstream by
//! the Coordinator's local write lock) and a best-effort cache mirror that
//! is "never the source of truth". Both are modeled as traits so a real
//! deployment could back the store with a relational/KV store and the
//! mirror with an actual cache, while this build keeps both in memory.

use crate::protocol::{GameState, Room, RoomId};
use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn get(&self, room_id: &str) -> anyhow::Result<Option<Room>>;
    async fn put(&self, room: Room) -> anyhow::Result<()>;
    async fn delete(&self, room_id: &str) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<Room>>;

    async fn put_game_state(&self, state: GameState) -> anyhow::Result<()>;
    async fn get_game_state(&self, room_id: &str) -> anyhow::Result<Option<GameState>>;
    async fn delete_game_state(&self, room_id: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct InMemoryRoomStore {
    rooms: DashMap<RoomId, Room>,
    game_states: DashMap<RoomId, GameState>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn get(&self, room_id: &str) -> anyhow::Result<Option<Room>> {
        Ok(self.rooms.get(room_id).map(|r| r.clone()))
    }

    async fn put(&self, room: Room) -> anyhow::Result<()> {
        self.rooms.insert(room.room_id.clone(), room);
        Ok(())
    }

    async fn delete(&self, room_id: &str) -> anyhow::Result<()> {
        self.rooms.remove(room_id);
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<Vec<Room>> {
        Ok(self.rooms.iter().map(|r| r.clone()).collect())
    }

    async fn put_game_state(&self, state: GameState) -> anyhow::Result<()> {
        self.game_states.insert(state.room_id.clone(), state);
        Ok(())
    }

    async fn get_game_state(&self, room_id: &str) -> anyhow::Result<Option<GameState>> {
        Ok(self.game_states.get(room_id).map(|s| s.clone()))
    }

    async fn delete_game_state(&self, room_id: &str) -> anyhow::Result<()> {
        self.game_states.remove(room_id);
        Ok(())
    }
}

/// Write-through mirror; a lookup miss here must always fall back to the
/// authoritative `RoomStore`, never be treated as "room does not exist".
#[async_trait]
pub trait CacheMirror: Send + Sync {
    async fn put(&self, room: &Room);
    async fn get(&self, room_id: &str) -> Option<Room>;
    async fn invalidate(&self, room_id: &str);
}

#[derive(Default)]
pub struct InMemoryCacheMirror {
    entries: DashMap<RoomId, Room>,
}

impl InMemoryCacheMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheMirror for InMemoryCacheMirror {
    async fn put(&self, room: &Room) {
        self.entries.insert(room.room_id.clone(), room.clone());
    }

    async fn get(&self, room_id: &str) -> Option<Room> {
        self.entries.get(room_id).map(|r| r.clone())
    }

    async fn invalidate(&self, room_id: &str) {
        self.entries.remove(room_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PlayerInfo, RoomStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_room(id: &str) -> Room {
        Room {
            room_id: id.into(),
            game_type: "bull".into(),
            room_type: "quick".into(),
            base_bet: 10,
            max_players: 2,
            current_players: 1,
            status: RoomStatus::Waiting,
            password_hash: None,
            creator_id: Uuid::new_v4(),
            players: vec![PlayerInfo {
                user_id: Uuid::new_v4(),
                uid: "1".into(),
                nickname: "a".into(),
                avatar: "".into(),
                position: 1,
                ready: false,
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryRoomStore::new();
        let room = sample_room("room_abc");
        store.put(room.clone()).await.unwrap();
        let fetched = store.get("room_abc").await.unwrap().unwrap();
        assert_eq!(fetched.room_id, room.room_id);
    }

    #[tokio::test]
    async fn delete_then_create_yields_no_room() {
        let store = InMemoryRoomStore::new();
        store.put(sample_room("room_abc")).await.unwrap();
        store.delete("room_abc").await.unwrap();
        let list = store.list().await.unwrap();
        assert!(!list.iter().any(|r| r.room_id == "room_abc"));
    }

    #[tokio::test]
    async fn cache_mirror_is_write_through() {
        let mirror = InMemoryCacheMirror::new();
        let room = sample_room("room_abc");
        mirror.put(&room).await;
        assert!(mirror.get("room_abc").await.is_some());
        mirror.invalidate("room_abc").await;
        assert!(mirror.get("room_abc").await.is_none());
    }
}
