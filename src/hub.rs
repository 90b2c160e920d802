//! C7 — Connection Hub.
//!
//! Owns live duplex sockets (as handles to their egress queues), room
//! memberships and the user->socket index for one instance. A single
//! readers-writer lock guards `rooms`, `client_room` and `users` together so
//! invariants I1-I3 hold across all three at once; admission (`accept`) and
//! release flow through a small fixed pool of register workers consuming a
//! bounded channel, so a connect storm rejects new connections explicitly
//! instead of queuing unboundedly.

use crate::error::{FabricError, FabricResult};
use crate::protocol::{RoomId, UserId};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use uuid::Uuid;

pub type HandleId = Uuid;

/// A single already-serialized outbound frame.
pub type Frame = String;

#[derive(Clone)]
pub struct EgressQueue {
    sender: mpsc::Sender<Frame>,
}

impl EgressQueue {
    /// Non-blocking push. A full queue signals the caller to close the
    /// session (the "overrun policy: drop-and-close" from the data model).
    pub fn try_send(&self, frame: Frame) -> Result<(), ()> {
        self.sender.try_send(frame).map_err(|_| ())
    }
}

pub struct ClientHandle {
    pub id: HandleId,
    pub user_id: UserId,
    pub remote_addr: SocketAddr,
}

#[derive(Default)]
struct HubTables {
    rooms: HashMap<RoomId, HashSet<HandleId>>,
    client_room: HashMap<HandleId, RoomId>,
    users: HashMap<UserId, HandleId>,
    handles: HashMap<HandleId, ClientHandle>,
}

impl HubTables {
    fn accept(&mut self, handle: ClientHandle, egress: &DashMap<HandleId, EgressQueue>) -> Option<HandleId> {
        let evicted = self.users.insert(handle.user_id, handle.id);
        if let Some(prior) = evicted {
            if prior != handle.id {
                self.remove_handle(prior, egress);
            }
        }
        self.handles.insert(handle.id, handle);
        evicted
    }

    fn remove_handle(&mut self, handle_id: HandleId, egress: &DashMap<HandleId, EgressQueue>) {
        if let Some(handle) = self.handles.remove(&handle_id) {
            if self.users.get(&handle.user_id) == Some(&handle_id) {
                self.users.remove(&handle.user_id);
            }
        }
        self.leave_room_inner(handle_id);
        egress.remove(&handle_id);
    }

    fn join_room_inner(&mut self, handle_id: HandleId, room_id: RoomId) {
        self.leave_room_inner(handle_id);
        self.rooms.entry(room_id.clone()).or_default().insert(handle_id);
        self.client_room.insert(handle_id, room_id);
    }

    fn leave_room_inner(&mut self, handle_id: HandleId) {
        if let Some(room_id) = self.client_room.remove(&handle_id) {
            if let Some(members) = self.rooms.get_mut(&room_id) {
                members.remove(&handle_id);
                if members.is_empty() {
                    self.rooms.remove(&room_id);
                }
            }
        }
    }
}

enum HubOp {
    Accept {
        handle: ClientHandle,
        egress: EgressQueue,
        reply: oneshot::Sender<()>,
    },
    Release {
        handle_id: HandleId,
        reply: oneshot::Sender<()>,
    },
}

pub struct ConnectionHub {
    tables: Arc<RwLock<HubTables>>,
    egress: Arc<DashMap<HandleId, EgressQueue>>,
    register_tx: mpsc::Sender<HubOp>,
}

impl ConnectionHub {
    pub fn new(register_workers: usize, register_queue_capacity: usize) -> Self {
        let tables = Arc::new(RwLock::new(HubTables::default()));
        let egress: Arc<DashMap<HandleId, EgressQueue>> = Arc::new(DashMap::new());
        let (tx, rx) = mpsc::channel(register_queue_capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for _ in 0..register_workers.max(1) {
            let tables = tables.clone();
            let egress = egress.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let op = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    let Some(op) = op else { break };
                    match op {
                        HubOp::Accept { handle, egress: eg, reply } => {
                            let id = handle.id;
                            egress.insert(id, eg);
                            let mut t = tables.write().await;
                            t.accept(handle, &egress);
                            let _ = reply.send(());
                        }
                        HubOp::Release { handle_id, reply } => {
                            let mut t = tables.write().await;
                            t.remove_handle(handle_id, &egress);
                            let _ = reply.send(());
                        }
                    }
                }
            });
        }

        Self {
            tables,
            egress,
            register_tx: tx,
        }
    }

    /// Registers a new session, evicting any prior handle for the same user.
    /// Fails with `unavailable` if the register channel is saturated — a
    /// fatal admission error for this connect attempt, per §4.1.
    pub async fn accept(&self, handle: ClientHandle, queue_capacity: usize) -> FabricResult<EgressReceiver> {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.register_tx
            .try_send(HubOp::Accept {
                handle,
                egress: EgressQueue { sender: tx },
                reply: reply_tx,
            })
            .map_err(|_| FabricError::Unavailable("register queue full".into()))?;
        reply_rx
            .await
            .map_err(|_| FabricError::Internal("register worker dropped reply".into()))?;
        Ok(EgressReceiver(rx))
    }

    pub async fn release(&self, handle_id: HandleId) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .register_tx
            .send(HubOp::Release { handle_id, reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }

    pub async fn join_room(&self, handle_id: HandleId, room_id: RoomId) {
        let mut t = self.tables.write().await;
        t.join_room_inner(handle_id, room_id);
    }

    pub async fn leave_room(&self, handle_id: HandleId) {
        let mut t = self.tables.write().await;
        t.leave_room_inner(handle_id);
    }

    pub async fn lookup_user(&self, user_id: UserId) -> Option<HandleId> {
        let t = self.tables.read().await;
        t.users.get(&user_id).copied()
    }

    pub async fn current_room(&self, handle_id: HandleId) -> Option<RoomId> {
        let t = self.tables.read().await;
        t.client_room.get(&handle_id).cloned()
    }

    pub async fn list_room(&self, room_id: &str) -> Vec<HandleId> {
        let t = self.tables.read().await;
        t.rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn list_all_handles(&self) -> Vec<HandleId> {
        let t = self.tables.read().await;
        t.handles.keys().copied().collect()
    }

    pub async fn counts(&self) -> (usize, usize) {
        let t = self.tables.read().await;
        (t.handles.len(), t.rooms.len())
    }

    pub fn egress_for(&self, handle_id: HandleId) -> Option<EgressQueue> {
        self.egress.get(&handle_id).map(|e| e.clone())
    }
}

pub struct EgressReceiver(pub mpsc::Receiver<Frame>);
