//! Room - the member set of one signaling room.
//!
//! All mutations and every read that feeds a broadcast run under the room's
//! lock, so joins, leaves and forwards within one room are totally ordered and
//! the notifications each member receives follow that order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::foundation::{ConnectionId, PeerId, RoomId, Timestamp};
use crate::domain::signaling::{PeerInfo, SignalMessage};
use crate::ports::{DeliveryError, PeerChannelRef};

/// The room was emptied and retired while the caller waited for its lock.
///
/// Callers fetch a fresh room from the registry and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Room was closed")]
pub struct RoomClosed;

/// One member's slot: its connection handle plus display identity.
#[derive(Debug, Clone)]
pub struct PeerSlot {
    pub channel: PeerChannelRef,
    pub info: PeerInfo,
    pub joined_at: Timestamp,
}

/// Read-only view of one member, as listed by the diagnostics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSnapshot {
    #[serde(flatten)]
    pub info: PeerInfo,
    pub joined_at: Timestamp,
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Every other member at the moment of the join (sent to the joiner).
    pub existing_peers: Vec<PeerInfo>,
    /// Connection that previously held this peer id, if the join replaced it.
    pub replaced: Option<ConnectionId>,
    /// Members the peer-joined notification could not be handed to.
    pub failed_deliveries: usize,
}

/// Result of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The peer was removed and the remaining members were notified.
    Left {
        remaining: usize,
        failed_deliveries: usize,
    },
    /// The peer was the last member; the room is now closed.
    Emptied,
    /// No such peer in the room.
    NotMember,
    /// The peer id is held by a different connection (it re-joined elsewhere).
    NotOwner,
}

/// Result of forwarding a frame to one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    Delivered,
    /// The room or the target peer does not exist.
    TargetAbsent,
    /// The target exists but its transport refused the frame.
    Unreachable(DeliveryError),
}

#[derive(Default)]
struct RoomState {
    peers: BTreeMap<PeerId, PeerSlot>,
}

/// A named group of peers exchanging signaling messages with each other only.
pub struct Room {
    id: RoomId,
    state: Mutex<RoomState>,
    closed: AtomicBool,
}

impl Room {
    /// Create an empty, open room.
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            state: Mutex::new(RoomState::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Whether the room has been emptied and retired.
    ///
    /// A closed room never reopens; the registry replaces it on the next join.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Add or replace a member.
    ///
    /// Sends the joiner a `peers-in-room` reply listing every other member,
    /// then notifies every other member with `peer-joined`. Both happen under
    /// the room lock. Delivery failures are logged and counted but never stop
    /// the fan-out.
    ///
    /// # Errors
    ///
    /// Returns [`RoomClosed`] if the room was retired before the lock was taken.
    pub async fn join(
        &self,
        peer_id: PeerId,
        display_name: Option<String>,
        channel: PeerChannelRef,
    ) -> Result<JoinOutcome, RoomClosed> {
        let mut state = self.state.lock().await;
        if self.is_closed() {
            return Err(RoomClosed);
        }

        let info = PeerInfo::new(peer_id.clone(), display_name);
        let joiner = channel.clone();
        let replaced = state
            .peers
            .insert(
                peer_id.clone(),
                PeerSlot {
                    channel,
                    info: info.clone(),
                    joined_at: Timestamp::now(),
                },
            )
            .map(|previous| previous.channel.connection_id())
            .filter(|previous| *previous != joiner.connection_id());

        let existing_peers: Vec<PeerInfo> = state
            .peers
            .iter()
            .filter(|(id, _)| **id != peer_id)
            .map(|(_, slot)| slot.info.clone())
            .collect();

        let reply = SignalMessage::peers_in_room(&self.id, &existing_peers).to_frame();
        if let Err(e) = joiner.deliver(reply) {
            tracing::warn!(
                room = %self.id,
                peer = %peer_id,
                "Failed to send peer list to joiner: {}",
                e
            );
        }

        let notice = SignalMessage::peer_joined(&self.id, &info).to_frame();
        let failed_deliveries = self.broadcast(&state, &peer_id, &notice);

        tracing::debug!(
            room = %self.id,
            peer = %peer_id,
            connection = %joiner.connection_id(),
            members = state.peers.len(),
            replaced = replaced.is_some(),
            "Peer joined"
        );

        Ok(JoinOutcome {
            existing_peers,
            replaced,
            failed_deliveries,
        })
    }

    /// Remove a member held by `connection`.
    ///
    /// When the last member leaves the room is marked closed and nothing is
    /// broadcast; otherwise the remaining members receive `peer-left`.
    pub async fn leave(&self, peer_id: &PeerId, connection: ConnectionId) -> LeaveOutcome {
        let mut state = self.state.lock().await;

        match state.peers.get(peer_id) {
            None => return LeaveOutcome::NotMember,
            Some(slot) if slot.channel.connection_id() != connection => {
                return LeaveOutcome::NotOwner
            }
            Some(_) => {}
        }
        state.peers.remove(peer_id);

        if state.peers.is_empty() {
            self.closed.store(true, Ordering::Release);
            tracing::debug!(room = %self.id, peer = %peer_id, "Last peer left, room closed");
            return LeaveOutcome::Emptied;
        }

        let notice = SignalMessage::peer_left(&self.id, peer_id).to_frame();
        let failed_deliveries = self.broadcast(&state, peer_id, &notice);

        tracing::debug!(
            room = %self.id,
            peer = %peer_id,
            remaining = state.peers.len(),
            "Peer left"
        );

        LeaveOutcome::Left {
            remaining: state.peers.len(),
            failed_deliveries,
        }
    }

    /// Push `frame` unmodified to `target`, if it is a member.
    pub async fn forward(&self, target: &PeerId, frame: String) -> ForwardOutcome {
        let state = self.state.lock().await;

        match state.peers.get(target) {
            Some(slot) => match slot.channel.deliver(frame) {
                Ok(()) => ForwardOutcome::Delivered,
                Err(e) => ForwardOutcome::Unreachable(e),
            },
            None => ForwardOutcome::TargetAbsent,
        }
    }

    /// Current members in peer-id order.
    pub async fn members(&self) -> Vec<MemberSnapshot> {
        self.state
            .lock()
            .await
            .peers
            .values()
            .map(|slot| MemberSnapshot {
                info: slot.info.clone(),
                joined_at: slot.joined_at,
            })
            .collect()
    }

    /// Ids of the current members in order.
    pub async fn peer_ids(&self) -> Vec<PeerId> {
        self.state.lock().await.peers.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.peers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Deliver `frame` to every member except `except`, returning the failure count.
    fn broadcast(&self, state: &RoomState, except: &PeerId, frame: &str) -> usize {
        let mut failed = 0;
        for (peer_id, slot) in state.peers.iter().filter(|(id, _)| *id != except) {
            if let Err(e) = slot.channel.deliver(frame.to_string()) {
                failed += 1;
                tracing::warn!(
                    room = %self.id,
                    peer = %peer_id,
                    connection = %slot.channel.connection_id(),
                    "Broadcast delivery failed: {}",
                    e
                );
            }
        }
        failed
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
