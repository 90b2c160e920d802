//! Reconnection-token / grace-window mechanism backing the duplex
//! `reconnect {room_id}` message (§6, §9's supplemented-features entry).
//!
//! Mirrors the Hub's handle-eviction-on-relogin model with an explicit grace
//! window on the *other* side of a drop: when a handle disconnects while
//! still in a room, a short-lived token is minted and the room's recent
//! broadcast history keeps accumulating in a capped buffer, so a client that
//! reconnects within the window can rejoin and replay what it missed instead
//! of re-syncing from a bare `get_game_state`.
//!
//! The token itself is never echoed back to the client over the wire — the
//! reconnecting socket is already authenticated by the same bearer-token
//! verifier (C1) that produced the original `user_id`, so a second opaque
//! secret would only guard against an attacker who does not already hold a
//! valid bearer token, which this fabric's auth model does not admit.
//! `validate_reconnection` keys on `(user_id, room_id)` and the window alone.

use crate::error::{FabricError, FabricResult};
use crate::metrics::ServerMetrics;
use crate::protocol::{Envelope, RoomId, UserId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct ReconnectionToken {
    token: String,
    user_id: UserId,
    room_id: RoomId,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ReconnectionToken {
    fn new(user_id: UserId, room_id: RoomId, grace_window_secs: u64) -> Self {
        let created_at = Utc::now();
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            room_id,
            created_at,
            expires_at: created_at + Duration::seconds(grace_window_secs as i64),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    fn is_valid(&self, user_id: UserId, room_id: &RoomId) -> bool {
        !self.is_expired() && self.user_id == user_id && self.room_id == *room_id
    }
}

struct BufferedEnvelope {
    envelope: Envelope,
    sequence: u64,
}

/// Capped ring of a room's recent broadcasts, oldest evicted first.
struct EventBuffer {
    max_size: usize,
    events: VecDeque<BufferedEnvelope>,
}

impl EventBuffer {
    fn new(max_size: usize) -> Self {
        Self {
            max_size,
            events: VecDeque::new(),
        }
    }

    fn push(&mut self, envelope: Envelope, sequence: u64) {
        self.events.push_back(BufferedEnvelope { envelope, sequence });
        while self.events.len() > self.max_size {
            self.events.pop_front();
        }
    }

    fn events_after(&self, after_sequence: u64) -> Vec<Envelope> {
        self.events
            .iter()
            .filter(|e| e.sequence > after_sequence)
            .map(|e| e.envelope.clone())
            .collect()
    }
}

struct DisconnectedHandle {
    token: ReconnectionToken,
    last_sequence: u64,
}

/// C9 (supplemented) — reconnection grace window and missed-event replay.
pub struct ReconnectionManager {
    disconnected: RwLock<HashMap<UserId, DisconnectedHandle>>,
    event_buffers: RwLock<HashMap<RoomId, EventBuffer>>,
    grace_window_secs: u64,
    event_buffer_size: usize,
    next_sequence: AtomicU64,
    metrics: Arc<ServerMetrics>,
}

impl ReconnectionManager {
    pub fn new(grace_window_secs: u64, event_buffer_size: usize, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            disconnected: RwLock::new(HashMap::new()),
            event_buffers: RwLock::new(HashMap::new()),
            grace_window_secs,
            event_buffer_size,
            next_sequence: AtomicU64::new(0),
            metrics,
        }
    }

    /// Records that `user_id` dropped out of `room_id` uncleanly, opening a
    /// grace window during which `reconnect` can rejoin it. Returns the
    /// minted token (kept for diagnostics/logging, not sent to the client).
    pub async fn register_disconnection(&self, user_id: UserId, room_id: RoomId) -> String {
        let last_sequence = self.next_sequence.load(Ordering::SeqCst);
        let token = ReconnectionToken::new(user_id, room_id, self.grace_window_secs);
        let token_str = token.token.clone();
        self.disconnected
            .write()
            .await
            .insert(user_id, DisconnectedHandle { token, last_sequence });
        self.metrics.increment_reconnection_tokens_issued();
        token_str
    }

    /// Validates a pending reconnection for `user_id` into `room_id` and
    /// returns the sequence number it last saw, for missed-event replay.
    pub async fn validate_reconnection(&self, user_id: UserId, room_id: &RoomId) -> FabricResult<u64> {
        let mut guard = self.disconnected.write().await;
        let Some(handle) = guard.get(&user_id) else {
            self.metrics.increment_reconnection_failures();
            return Err(FabricError::NotFound("no pending reconnection for this user".into()));
        };
        if !handle.token.is_valid(user_id, room_id) {
            self.metrics.increment_reconnection_failures();
            guard.remove(&user_id);
            return Err(FabricError::PreconditionFailed(
                "reconnection window expired or room mismatch".into(),
            ));
        }
        let last_sequence = handle.last_sequence;
        guard.remove(&user_id);
        self.metrics.increment_reconnections_completed();
        Ok(last_sequence)
    }

    /// Appends a room-scoped envelope to that room's replay buffer. Called
    /// from the Broadcaster for every room-scoped delivery, so the buffer
    /// mirrors exactly what connected members received.
    pub async fn buffer_event(&self, room_id: &RoomId, envelope: Envelope) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let mut buffers = self.event_buffers.write().await;
        buffers
            .entry(room_id.clone())
            .or_insert_with(|| EventBuffer::new(self.event_buffer_size))
            .push(envelope, sequence);
    }

    /// Envelopes buffered for `room_id` with a sequence number greater than
    /// `after_sequence` — what a reconnecting client missed.
    pub async fn missed_events(&self, room_id: &RoomId, after_sequence: u64) -> Vec<Envelope> {
        let buffers = self.event_buffers.read().await;
        buffers
            .get(room_id)
            .map(|b| b.events_after(after_sequence))
            .unwrap_or_default()
    }

    /// Drops disconnected-handle bookkeeping past its grace window; call
    /// periodically so a never-reconnected player doesn't leak forever.
    pub async fn cleanup_expired(&self) -> usize {
        let mut guard = self.disconnected.write().await;
        let before = guard.len();
        guard.retain(|_, handle| !handle.token.is_expired());
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(grace_window_secs: u64) -> ReconnectionManager {
        ReconnectionManager::new(grace_window_secs, 10, Arc::new(ServerMetrics::new()))
    }

    #[tokio::test]
    async fn valid_reconnection_within_window_succeeds() {
        let mgr = manager(30);
        let user = Uuid::new_v4();
        let room: RoomId = "room_abc".into();
        mgr.register_disconnection(user, room.clone()).await;
        assert!(mgr.validate_reconnection(user, &room).await.is_ok());
    }

    #[tokio::test]
    async fn reconnection_without_prior_disconnect_is_rejected() {
        let mgr = manager(30);
        let user = Uuid::new_v4();
        let room: RoomId = "room_abc".into();
        let err = mgr.validate_reconnection(user, &room).await.unwrap_err();
        assert_eq!(err.code(), "not-found");
    }

    #[tokio::test]
    async fn wrong_room_is_rejected_and_consumes_the_pending_entry() {
        let mgr = manager(30);
        let user = Uuid::new_v4();
        mgr.register_disconnection(user, "room_abc".into()).await;
        let err = mgr.validate_reconnection(user, &"room_xyz".into()).await.unwrap_err();
        assert_eq!(err.code(), "precondition-failed");
        // Token was consumed on the failed attempt; a second try with the
        // correct room no longer finds a pending reconnection.
        let err2 = mgr.validate_reconnection(user, &"room_abc".into()).await.unwrap_err();
        assert_eq!(err2.code(), "not-found");
    }

    #[tokio::test]
    async fn expired_window_is_rejected() {
        let mgr = manager(0);
        let user = Uuid::new_v4();
        let room: RoomId = "room_abc".into();
        mgr.register_disconnection(user, room.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let err = mgr.validate_reconnection(user, &room).await.unwrap_err();
        assert_eq!(err.code(), "precondition-failed");
    }

    #[tokio::test]
    async fn missed_events_replay_only_what_came_after() {
        let mgr = manager(30);
        let room: RoomId = "room_abc".into();
        mgr.buffer_event(&room, Envelope::new("room_updated", serde_json::json!({"n": 1}))).await;
        mgr.buffer_event(&room, Envelope::new("room_updated", serde_json::json!({"n": 2}))).await;
        mgr.buffer_event(&room, Envelope::new("room_updated", serde_json::json!({"n": 3}))).await;

        let user = Uuid::new_v4();
        mgr.register_disconnection(user, room.clone()).await;
        mgr.buffer_event(&room, Envelope::new("room_updated", serde_json::json!({"n": 4}))).await;

        let last_sequence = mgr.validate_reconnection(user, &room).await.unwrap();
        let missed = mgr.missed_events(&room, last_sequence).await;
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].raw_data, serde_json::json!({"n": 4}));
    }

    #[tokio::test]
    async fn event_buffer_evicts_oldest_past_capacity() {
        let mgr = ReconnectionManager::new(30, 2, Arc::new(ServerMetrics::new()));
        let room: RoomId = "room_abc".into();
        mgr.buffer_event(&room, Envelope::new("room_updated", serde_json::json!({"n": 1}))).await;
        mgr.buffer_event(&room, Envelope::new("room_updated", serde_json::json!({"n": 2}))).await;
        mgr.buffer_event(&room, Envelope::new("room_updated", serde_json::json!({"n": 3}))).await;

        let missed = mgr.missed_events(&room, 0).await;
        assert_eq!(missed.len(), 2);
        assert_eq!(missed[0].raw_data, serde_json::json!({"n": 2}));
    }

    #[tokio::test]
    async fn cleanup_expired_drops_stale_entries() {
        let mgr = manager(0);
        let user = Uuid::new_v4();
        mgr.register_disconnection(user, "room_abc".into()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(mgr.cleanup_expired().await, 1);
        assert_eq!(mgr.cleanup_expired().await, 0);
    }
}
