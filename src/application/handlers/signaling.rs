//! SignalingRouter - Routes decoded client frames to rooms.
//!
//! One router is shared by every connection. Each connection owns a
//! [`ConnectionSession`] that remembers which room and peer id it joined, so
//! the membership can be cleaned up however the connection ends.
//!
//! ## Connection states
//!
//! ```text
//! Connected → AwaitingMessage ⇄ Dispatching
//!                   │                │
//!                   └──→ Closed ←────┘
//! ```

use std::sync::Arc;

use crate::application::rooms::{ForwardOutcome, LeaveOutcome, RoomRegistry};
use crate::domain::foundation::{ConnectionId, PeerId, RoomId};
use crate::domain::signaling::{ClientRequest, RelayKind};
use crate::ports::PeerChannelRef;

/// Lifecycle of one client connection as seen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    AwaitingMessage,
    Dispatching,
    Closed,
}

/// What the transport should do after a frame was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Keep reading frames.
    Continue,
    /// Stop reading, run [`SignalingRouter::disconnect`] and close the socket.
    Close,
}

/// Per-connection bookkeeping.
#[derive(Debug)]
pub struct ConnectionSession {
    channel: PeerChannelRef,
    state: ConnectionState,
    membership: Option<(RoomId, PeerId)>,
}

impl ConnectionSession {
    pub fn new(channel: PeerChannelRef) -> Self {
        Self {
            channel,
            state: ConnectionState::Connected,
            membership: None,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.channel.connection_id()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The room and peer id this connection last joined as, if still a member.
    pub fn membership(&self) -> Option<&(RoomId, PeerId)> {
        self.membership.as_ref()
    }

    /// Marks the connection ready to receive its first frame.
    pub fn start(&mut self) {
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::AwaitingMessage;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }
}

/// Decodes client frames and applies them to the room registry.
pub struct SignalingRouter {
    registry: Arc<RoomRegistry>,
    require_hex_room_ids: bool,
}

impl SignalingRouter {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self {
            registry,
            require_hex_room_ids: false,
        }
    }

    /// Reject joins to room ids that are not 16 lowercase hex characters.
    pub fn with_hex_room_ids(mut self, required: bool) -> Self {
        self.require_hex_room_ids = required;
        self
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Handle one text frame from `session`'s client.
    pub async fn dispatch(&self, session: &mut ConnectionSession, frame: &str) -> DispatchOutcome {
        if session.is_closed() {
            return DispatchOutcome::Close;
        }
        session.state = ConnectionState::Dispatching;

        let request = match ClientRequest::decode(frame) {
            Ok(request) => request,
            Err(e) if e.is_fatal() => {
                tracing::warn!(
                    connection = %session.connection_id(),
                    "Closing connection after malformed frame: {}",
                    e
                );
                return DispatchOutcome::Close;
            }
            Err(e) => {
                tracing::warn!(
                    connection = %session.connection_id(),
                    "Dropping frame: {}",
                    e
                );
                session.state = ConnectionState::AwaitingMessage;
                return DispatchOutcome::Continue;
            }
        };

        let outcome = match request {
            ClientRequest::Join { room, peer, name } => {
                self.handle_join(session, room, peer, name).await
            }
            ClientRequest::Leave { room, peer } => self.handle_leave(session, room, peer).await,
            ClientRequest::Relay { kind, room, target } => {
                self.handle_relay(session, kind, room, target, frame).await
            }
            ClientRequest::Ignored { event } => {
                tracing::debug!(
                    connection = %session.connection_id(),
                    event = %event,
                    "Ignoring event"
                );
                DispatchOutcome::Continue
            }
        };

        if outcome == DispatchOutcome::Continue {
            session.state = ConnectionState::AwaitingMessage;
        }
        outcome
    }

    /// Leave whatever room the connection is still a member of.
    ///
    /// Safe to call on every exit path; later calls are no-ops.
    pub async fn disconnect(&self, session: &mut ConnectionSession) {
        if let Some((room, peer)) = session.membership.take() {
            let outcome = self
                .registry
                .leave(&room, &peer, session.connection_id())
                .await;
            tracing::debug!(
                room = %room,
                peer = %peer,
                connection = %session.connection_id(),
                outcome = ?outcome,
                "Implicit leave on disconnect"
            );
        }
        session.state = ConnectionState::Closed;
    }

    async fn handle_join(
        &self,
        session: &mut ConnectionSession,
        room: RoomId,
        peer: PeerId,
        name: Option<String>,
    ) -> DispatchOutcome {
        if self.require_hex_room_ids {
            if let Err(e) = room.ensure_hex() {
                tracing::warn!(
                    room = %room,
                    peer = %peer,
                    connection = %session.connection_id(),
                    "Rejecting join: {}",
                    e
                );
                return DispatchOutcome::Continue;
            }
        }

        let target = (room, peer);
        if let Some(previous) = session.membership.take() {
            if previous != target {
                self.registry
                    .leave(&previous.0, &previous.1, session.connection_id())
                    .await;
            }
        }

        let (room, peer) = target;
        let outcome = self
            .registry
            .join(&room, peer.clone(), name, session.channel.clone())
            .await;
        if let Some(replaced) = outcome.replaced {
            tracing::info!(
                room = %room,
                peer = %peer,
                connection = %session.connection_id(),
                replaced = %replaced,
                "Peer id taken over by new connection"
            );
        }
        session.membership = Some((room, peer));
        DispatchOutcome::Continue
    }

    async fn handle_leave(
        &self,
        session: &mut ConnectionSession,
        room: Option<RoomId>,
        peer: Option<PeerId>,
    ) -> DispatchOutcome {
        let membership = session.membership.clone();
        let room = room.or_else(|| membership.as_ref().map(|(room, _)| room.clone()));
        let peer = peer.or_else(|| membership.as_ref().map(|(_, peer)| peer.clone()));

        if let (Some(room), Some(peer)) = (room, peer) {
            let outcome = self
                .registry
                .leave(&room, &peer, session.connection_id())
                .await;
            if matches!(outcome, LeaveOutcome::NotMember | LeaveOutcome::NotOwner) {
                tracing::debug!(
                    room = %room,
                    peer = %peer,
                    connection = %session.connection_id(),
                    outcome = ?outcome,
                    "Leave ignored"
                );
            }
            if membership.as_ref() == Some(&(room, peer)) {
                session.membership = None;
            }
        }

        DispatchOutcome::Close
    }

    async fn handle_relay(
        &self,
        session: &ConnectionSession,
        kind: RelayKind,
        room: RoomId,
        target: PeerId,
        frame: &str,
    ) -> DispatchOutcome {
        match self.registry.forward(&room, &target, frame.to_string()).await {
            ForwardOutcome::Delivered => {
                tracing::debug!(
                    room = %room,
                    peer = %target,
                    connection = %session.connection_id(),
                    event = %kind.as_event(),
                    "Forwarded"
                );
            }
            ForwardOutcome::TargetAbsent => {
                tracing::debug!(
                    room = %room,
                    peer = %target,
                    event = %kind.as_event(),
                    "Forward target not in room, dropped"
                );
            }
            ForwardOutcome::Unreachable(e) => {
                tracing::warn!(
                    room = %room,
                    peer = %target,
                    event = %kind.as_event(),
                    "Forward target unreachable: {}",
                    e
                );
            }
        }
        DispatchOutcome::Continue
    }
}
