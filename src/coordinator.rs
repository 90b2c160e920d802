//! C9 — Room Lifecycle Coordinator.
//!
//! Authoritative transitions on rooms. Write paths are serialized by a local
//! write lock keyed on `room_id` (C6); `start` additionally takes a
//! distributed lock (C5) because two callers — possibly on different
//! instances — could race it. Side effects (hub notification) flow through
//! the Worker Pool (C4) as a post-commit outbox so locks are released before
//! the HTTP round-trip begins.

use crate::distributed::DistributedLock;
use crate::error::{FabricError, FabricResult};
use crate::metrics::ServerMetrics;
use crate::protocol::room::{hash_password, validate_create_request, verify_password};
use crate::protocol::{CreateRoomRequest, PlayerInfo, Room, RoomId, RoomStatus, UserId};
use crate::rate_limit::FabricRateLimits;
use crate::registry::ServiceRegistry;
use crate::rules::RulesRegistry;
use crate::store::{CacheMirror, RoomStore};
use crate::rwlock_map::RwLockMap;
use crate::worker_pool::WorkerPool;
use crate::protocol::GameState;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const START_LOCK_TTL: Duration = Duration::from_secs(10);
const NOTIFY_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyAction {
    RoomCreated,
    RoomDeleted,
    Join,
    Leave,
    Ready,
    CancelReady,
    GameStarted,
    GameEnd,
    TimerStart,
    TimerStop,
    GameStateUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyBody {
    pub room_id: RoomId,
    pub action: NotifyAction,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_data: Option<serde_json::Value>,
}

pub struct RoomCoordinator {
    store: Arc<dyn RoomStore>,
    cache: Arc<dyn CacheMirror>,
    room_locks: RwLockMap<RoomId>,
    distributed_lock: Arc<dyn DistributedLock>,
    registry: Arc<dyn ServiceRegistry>,
    worker_pool: Arc<WorkerPool>,
    rules: Arc<RulesRegistry>,
    rate_limits: Arc<FabricRateLimits>,
    metrics: Arc<ServerMetrics>,
    http: reqwest::Client,
    service_name: String,
}

impl RoomCoordinator {
    pub fn new(
        store: Arc<dyn RoomStore>,
        cache: Arc<dyn CacheMirror>,
        distributed_lock: Arc<dyn DistributedLock>,
        registry: Arc<dyn ServiceRegistry>,
        worker_pool: Arc<WorkerPool>,
        rules: Arc<RulesRegistry>,
        rate_limits: Arc<FabricRateLimits>,
        metrics: Arc<ServerMetrics>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            room_locks: RwLockMap::new(),
            distributed_lock,
            registry,
            worker_pool,
            rules,
            rate_limits,
            metrics,
            http: reqwest::Client::builder()
                .timeout(NOTIFY_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            service_name: service_name.into(),
        }
    }

    pub async fn create(&self, owner: UserId, request: CreateRoomRequest) -> FabricResult<Room> {
        validate_create_request(&request)?;
        if !self.rate_limits.room_creation.check(&owner) {
            self.metrics.increment_rate_limit_rejections();
            return Err(FabricError::Unavailable("room-creation rate limit exceeded".into()));
        }

        let room_id = format!("{}{}", crate::protocol::ROOM_ID_PREFIX, &Uuid::new_v4().simple().to_string()[..8]);
        let now = Utc::now();
        let room = Room {
            room_id: room_id.clone(),
            game_type: request.game_type,
            room_type: request.room_type,
            base_bet: request.base_bet,
            max_players: request.max_players,
            current_players: 1,
            status: RoomStatus::Waiting,
            password_hash: request.password.as_deref().map(hash_password),
            creator_id: owner,
            players: vec![PlayerInfo {
                user_id: owner,
                uid: owner.to_string(),
                nickname: String::new(),
                avatar: String::new(),
                position: 1,
                ready: false,
            }],
            created_at: now,
            updated_at: now,
        };

        let _guard = self.room_locks.lock(&room_id).await;
        self.store
            .put(room.clone())
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?;
        self.cache.put(&room).await;
        drop(_guard);

        self.metrics.increment_rooms_created();
        self.dispatch_notify(
            room_id,
            NotifyAction::RoomCreated,
            owner,
            Some(serde_json::to_value(&room).unwrap_or_default()),
        );
        Ok(room)
    }

    pub async fn join(&self, user: UserId, room_id: &str, password: Option<&str>) -> FabricResult<Room> {
        if !self.rate_limits.join_attempts.check(&user) {
            self.metrics.increment_rate_limit_rejections();
            return Err(FabricError::Unavailable("join-attempt rate limit exceeded".into()));
        }
        let _guard = self.room_locks.lock(&room_id.to_string()).await;

        let mut room = self
            .store
            .get(room_id)
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?
            .ok_or_else(|| FabricError::NotFound(format!("room {room_id} not found")))?;

        if let Some(hash) = &room.password_hash {
            let provided = password.unwrap_or("");
            if !verify_password(provided, hash) {
                return Err(FabricError::Unauthenticated("incorrect room password".into()));
            }
        }
        if room.status != RoomStatus::Waiting {
            return Err(FabricError::Conflict("room is not accepting new players".into()));
        }
        if room.current_players >= room.max_players {
            return Err(FabricError::Conflict("room is full".into()));
        }
        if room.find_player(user).is_some() {
            return Err(FabricError::Conflict("user already in room".into()));
        }

        room.players.push(PlayerInfo {
            user_id: user,
            uid: user.to_string(),
            nickname: String::new(),
            avatar: String::new(),
            position: room.current_players + 1,
            ready: false,
        });
        room.current_players = room.players.len() as u8;
        room.updated_at = Utc::now();

        self.store
            .put(room.clone())
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?;
        self.cache.put(&room).await;
        drop(_guard);

        self.metrics.increment_joins();
        self.dispatch_notify(
            room_id.to_string(),
            NotifyAction::Join,
            user,
            Some(serde_json::to_value(&room).unwrap_or_default()),
        );
        Ok(room)
    }

    pub async fn leave(&self, user: UserId, room_id: &str) -> FabricResult<()> {
        let _guard = self.room_locks.lock(&room_id.to_string()).await;

        let mut room = self
            .store
            .get(room_id)
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?
            .ok_or_else(|| FabricError::NotFound(format!("room {room_id} not found")))?;

        if room.status == RoomStatus::InGame {
            return Err(FabricError::Forbidden("cannot leave a room while a game is in progress".into()));
        }

        let was_creator = room.creator_id == user;
        room.players.retain(|p| p.user_id != user);

        if room.players.is_empty() {
            self.store
                .delete(room_id)
                .await
                .map_err(|e| FabricError::Internal(e.to_string()))?;
            self.cache.invalidate(room_id).await;
            drop(_guard);
            self.metrics.increment_leaves();
            self.metrics.increment_rooms_deleted();
            self.dispatch_notify(room_id.to_string(), NotifyAction::RoomDeleted, user, Some(serde_json::json!({"room_id": room_id})));
            return Ok(());
        }

        if was_creator {
            room.creator_id = room.players[0].user_id;
        }
        room.recompute_positions();
        room.updated_at = Utc::now();

        self.store
            .put(room.clone())
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?;
        self.cache.put(&room).await;
        drop(_guard);

        self.metrics.increment_leaves();
        self.dispatch_notify(
            room_id.to_string(),
            NotifyAction::Leave,
            user,
            Some(serde_json::to_value(&room).unwrap_or_default()),
        );
        Ok(())
    }

    pub async fn set_ready(&self, user: UserId, room_id: &str, ready: bool) -> FabricResult<Room> {
        let _guard = self.room_locks.lock(&room_id.to_string()).await;

        let mut room = self
            .store
            .get(room_id)
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?
            .ok_or_else(|| FabricError::NotFound(format!("room {room_id} not found")))?;

        if room.status != RoomStatus::Waiting {
            return Err(FabricError::PreconditionFailed("room is not waiting for players".into()));
        }
        let player = room
            .find_player_mut(user)
            .ok_or_else(|| FabricError::NotFound("user is not in this room".into()))?;
        player.ready = ready;
        room.updated_at = Utc::now();

        self.store
            .put(room.clone())
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?;
        self.cache.put(&room).await;
        drop(_guard);

        let action = if ready { NotifyAction::Ready } else { NotifyAction::CancelReady };
        self.dispatch_notify(room_id.to_string(), action, user, Some(serde_json::to_value(&room).unwrap_or_default()));
        Ok(room)
    }

    /// Acquires the distributed lock on `room:{room_id}:start` because two
    /// callers — potentially on different instances — could race the start.
    pub async fn start(&self, caller: UserId, room_id: &str) -> FabricResult<Room> {
        let lock_key = format!("room:{room_id}:start");
        let lock_handle = self
            .distributed_lock
            .acquire(&lock_key, START_LOCK_TTL, START_LOCK_TTL)
            .await
            .map_err(|_| FabricError::Unavailable("could not acquire start lock in time".into()))?;

        let result = self.start_locked(caller, room_id).await;

        let _ = self.distributed_lock.release(&lock_handle).await;
        result
    }

    async fn start_locked(&self, caller: UserId, room_id: &str) -> FabricResult<Room> {
        let _guard = self.room_locks.lock(&room_id.to_string()).await;

        let mut room = self
            .store
            .get(room_id)
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?
            .ok_or_else(|| FabricError::NotFound(format!("room {room_id} not found")))?;

        if room.creator_id != caller {
            return Err(FabricError::Forbidden("only the room creator can start the game".into()));
        }
        if room.status != RoomStatus::Waiting {
            return Err(FabricError::PreconditionFailed("room is not waiting".into()));
        }
        if room.current_players < 2 {
            return Err(FabricError::PreconditionFailed("at least two players are required to start".into()));
        }
        if !room.all_ready() {
            return Err(FabricError::PreconditionFailed("not all players are ready".into()));
        }

        let strategy = self
            .rules
            .get(&room.game_type)
            .ok_or_else(|| FabricError::PreconditionFailed(format!("no rules strategy for game_type {}", room.game_type)))?;

        // Partial failure in `start`: if game-state derivation fails, the
        // room remains in `waiting`, the lock is released (by the caller),
        // and no notify is sent.
        let game_state = strategy
            .deal(&room)
            .map_err(|e| FabricError::Internal(e.to_string()))?;

        room.status = RoomStatus::InGame;
        room.updated_at = Utc::now();

        self.store
            .put(room.clone())
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?;
        self.store
            .put_game_state(game_state.clone())
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?;
        self.cache.put(&room).await;
        drop(_guard);

        self.metrics.increment_games_started();
        let payload = serde_json::json!({
            "room": room,
            "game_state": game_state,
        });
        self.dispatch_notify(room_id.to_string(), NotifyAction::GameStarted, caller, Some(payload));
        Ok(room)
    }

    /// Read-through lookup for the websocket layer's `reconnect` and
    /// `get_game_state` handlers — no locking beyond the store's own, since
    /// these never race a write path that would leave a caller with a torn
    /// view (the store always holds a complete `Room`/`GameState`).
    pub async fn get_room(&self, room_id: &str) -> FabricResult<Room> {
        self.store
            .get(room_id)
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?
            .ok_or_else(|| FabricError::NotFound(format!("room {room_id} not found")))
    }

    pub async fn get_game_state(&self, room_id: &str) -> FabricResult<GameState> {
        self.store
            .get_game_state(room_id)
            .await
            .map_err(|e| FabricError::Internal(e.to_string()))?
            .ok_or_else(|| FabricError::NotFound(format!("game state for room {room_id} not found")))
    }

    /// Submits the hub notification to the Worker Pool; never blocks the
    /// originating request, and a failed notify is observed by clients only
    /// on their next `get_game_state`/`reconnect` per §7.
    fn dispatch_notify(&self, room_id: RoomId, action: NotifyAction, user_id: UserId, room_data: Option<serde_json::Value>) {
        let registry = self.registry.clone();
        let http = self.http.clone();
        let service_name = self.service_name.clone();
        let metrics = self.metrics.clone();
        let outcome = self.worker_pool.submit(async move {
            let body = NotifyBody { room_id: room_id.clone(), action, user_id, room_data };
            let hub = match registry.locate(&service_name, &room_id).await {
                Ok(Some(hub)) => hub,
                Ok(None) => {
                    tracing::warn!(%room_id, "no hub instance located for notify");
                    metrics.increment_notify_failures();
                    return;
                }
                Err(e) => {
                    tracing::warn!(%room_id, error = %e, "registry lookup failed for notify");
                    metrics.increment_notify_failures();
                    return;
                }
            };
            let url = format!("http://{}:{}/internal/room/notify", hub.address, hub.port);
            if let Err(e) = http.post(&url).json(&body).send().await {
                tracing::warn!(%room_id, error = %e, "notify POST failed");
                metrics.increment_notify_failures();
            }
        });
        if !matches!(outcome, crate::worker_pool::SubmitOutcome::Accepted) {
            tracing::warn!(?outcome, "notify task dropped by worker pool");
            self.metrics.increment_notify_failures();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::InMemoryDistributedLock;
    use crate::registry::InMemoryServiceRegistry;
    use crate::store::{InMemoryCacheMirror, InMemoryRoomStore};

    fn coordinator() -> RoomCoordinator {
        RoomCoordinator::new(
            Arc::new(InMemoryRoomStore::new()),
            Arc::new(InMemoryCacheMirror::new()),
            Arc::new(InMemoryDistributedLock::new()),
            Arc::new(InMemoryServiceRegistry::new()),
            Arc::new(WorkerPool::new(2, 64, Duration::from_secs(30))),
            Arc::new(RulesRegistry::default()),
            Arc::new(FabricRateLimits::new(1000, 1000, 1000)),
            Arc::new(ServerMetrics::new()),
            "game-fabric",
        )
    }

    #[tokio::test]
    async fn s1_two_users_join_ready_and_start() {
        let coord = coordinator();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        let room = coord
            .create(
                u1,
                CreateRoomRequest {
                    game_type: "bull".into(),
                    room_type: "quick".into(),
                    base_bet: 10,
                    max_players: 2,
                    password: None,
                },
            )
            .await
            .unwrap();

        coord.join(u2, &room.room_id, None).await.unwrap();
        coord.set_ready(u1, &room.room_id, true).await.unwrap();
        coord.set_ready(u2, &room.room_id, true).await.unwrap();

        let started = coord.start(u1, &room.room_id).await.unwrap();
        assert_eq!(started.status, RoomStatus::InGame);
    }

    #[tokio::test]
    async fn s2_password_enforcement() {
        let coord = coordinator();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let room = coord
            .create(
                u1,
                CreateRoomRequest {
                    game_type: "bull".into(),
                    room_type: "quick".into(),
                    base_bet: 10,
                    max_players: 2,
                    password: Some("s3cret".into()),
                },
            )
            .await
            .unwrap();

        let wrong = coord.join(u2, &room.room_id, Some("wrong")).await;
        assert!(matches!(wrong, Err(FabricError::Unauthenticated(_))));

        let right = coord.join(u2, &room.room_id, Some("s3cret")).await;
        assert!(right.is_ok());
    }

    #[tokio::test]
    async fn s3_full_room_rejection_under_concurrency() {
        let coord = Arc::new(coordinator());
        let u1 = Uuid::new_v4();
        let room = coord
            .create(
                u1,
                CreateRoomRequest {
                    game_type: "bull".into(),
                    room_type: "quick".into(),
                    base_bet: 10,
                    max_players: 2,
                    password: None,
                },
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let coord = coord.clone();
            let room_id = room.room_id.clone();
            handles.push(tokio::spawn(async move {
                coord.join(Uuid::new_v4(), &room_id, None).await.is_ok()
            }));
        }
        let mut successes = 0;
        for h in handles {
            if h.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn s4_start_race_exactly_one_winner() {
        let coord = Arc::new(coordinator());
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let room = coord
            .create(
                u1,
                CreateRoomRequest {
                    game_type: "bull".into(),
                    room_type: "quick".into(),
                    base_bet: 10,
                    max_players: 2,
                    password: None,
                },
            )
            .await
            .unwrap();
        coord.join(u2, &room.room_id, None).await.unwrap();
        coord.set_ready(u1, &room.room_id, true).await.unwrap();
        coord.set_ready(u2, &room.room_id, true).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let coord = coord.clone();
            let room_id = room.room_id.clone();
            handles.push(tokio::spawn(async move { coord.start(u1, &room_id).await }));
        }
        let mut successes = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn create_then_leave_removes_room() {
        let coord = coordinator();
        let u1 = Uuid::new_v4();
        let room = coord
            .create(
                u1,
                CreateRoomRequest {
                    game_type: "bull".into(),
                    room_type: "quick".into(),
                    base_bet: 10,
                    max_players: 2,
                    password: None,
                },
            )
            .await
            .unwrap();
        coord.leave(u1, &room.room_id).await.unwrap();
        let result = coord.join(Uuid::new_v4(), &room.room_id, None).await;
        assert!(matches!(result, Err(FabricError::NotFound(_))));
    }
}
