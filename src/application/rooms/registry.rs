//! Room registry - the process-wide map of live rooms.
//!
//! # Architecture
//!
//! ```text
//! RoomRegistry
//! ├── r1 ─ Room { A, B }
//! └── r2 ─ Room { C }
//! ```
//!
//! # Lock Order
//!
//! A room's lock may be held while the registry lock is taken, never the
//! reverse. The registry never awaits a room lock while holding its own, so
//! snapshots clone the room handles first and then visit each room.
//!
//! # Room Lifecycle
//!
//! A room is created by the first join and retired by the last leave. The
//! leaving task marks the room closed under the room lock and then removes it
//! from the map. A join racing with that leave either finds the room closed
//! and retries, or finds the closed room still mapped and replaces it with a
//! fresh one. Removal only deletes the exact room that was closed, so each
//! room is created once and removed at most once.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::foundation::{ConnectionId, PeerId, RoomId};
use crate::ports::PeerChannelRef;

use super::room::{ForwardOutcome, JoinOutcome, LeaveOutcome, MemberSnapshot, Room};

/// Point-in-time listing of every non-empty room and its members.
pub type RegistrySnapshot = BTreeMap<RoomId, Vec<MemberSnapshot>>;

/// Shared map of room id to live room.
///
/// Created once at startup and shared by every connection.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Room>>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the open room with this id, creating it if absent.
    ///
    /// A mapped room that has already been closed is replaced.
    pub async fn get_or_create(&self, room_id: &RoomId) -> Arc<Room> {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(room_id).filter(|room| !room.is_closed()) {
                return room.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        match rooms.get(room_id) {
            Some(room) if !room.is_closed() => room.clone(),
            _ => {
                let room = Arc::new(Room::new(room_id.clone()));
                rooms.insert(room_id.clone(), room.clone());
                tracing::info!(room = %room_id, "Room created");
                room
            }
        }
    }

    /// Look up a room without creating it.
    pub async fn get(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Remove `room` from the map if it is still the mapped instance and closed.
    ///
    /// Returns whether the entry was removed.
    pub async fn remove_if_empty(&self, room: &Arc<Room>) -> bool {
        if !room.is_closed() {
            return false;
        }

        let mut rooms = self.rooms.write().await;
        let same_instance = rooms
            .get(room.id())
            .is_some_and(|mapped| Arc::ptr_eq(mapped, room));
        if same_instance {
            rooms.remove(room.id());
            tracing::info!(room = %room.id(), "Room removed");
        }
        same_instance
    }

    /// Add `peer_id` to the room, creating the room if needed.
    ///
    /// Retries against a fresh room when the fetched one is retired before the
    /// join acquires it.
    pub async fn join(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        display_name: Option<String>,
        channel: PeerChannelRef,
    ) -> JoinOutcome {
        loop {
            let room = self.get_or_create(room_id).await;
            match room
                .join(peer_id.clone(), display_name.clone(), channel.clone())
                .await
            {
                Ok(outcome) => return outcome,
                Err(_) => {
                    tracing::debug!(room = %room_id, "Room closed during join, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    /// Remove `peer_id` from the room if `connection` still holds it.
    ///
    /// Retires the room when its last member leaves.
    pub async fn leave(
        &self,
        room_id: &RoomId,
        peer_id: &PeerId,
        connection: ConnectionId,
    ) -> LeaveOutcome {
        let Some(room) = self.get(room_id).await else {
            return LeaveOutcome::NotMember;
        };

        let outcome = room.leave(peer_id, connection).await;
        if outcome == LeaveOutcome::Emptied {
            self.remove_if_empty(&room).await;
        }
        outcome
    }

    /// Deliver `frame` to `target` in `room_id`.
    pub async fn forward(&self, room_id: &RoomId, target: &PeerId, frame: String) -> ForwardOutcome {
        match self.get(room_id).await {
            Some(room) => room.forward(target, frame).await,
            None => ForwardOutcome::TargetAbsent,
        }
    }

    /// Consistent per-room listing of every non-empty room.
    ///
    /// Each room's member list is read under that room's lock.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();

        let mut snapshot = RegistrySnapshot::new();
        for room in rooms {
            let members = room.members().await;
            if !members.is_empty() {
                snapshot.insert(room.id().clone(), members);
            }
        }
        snapshot
    }

    /// Number of mapped rooms, including any that are mid-retirement.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Total members across all rooms.
    pub async fn peer_count(&self) -> usize {
        self.snapshot().await.values().map(Vec::len).sum()
    }
}
