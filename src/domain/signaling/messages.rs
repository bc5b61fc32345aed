//! Signaling message types exchanged over the relay.
//!
//! Every frame is a JSON envelope `{ "event", "room", "data" }`:
//! - Client → Server: join, leave (alias `disconnect`), offer, answer, ice-candidate
//! - Server → Client: peers-in-room, peer-joined, peer-left, and relayed
//!   offer/answer/ice-candidate frames forwarded verbatim

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::domain::foundation::{PeerId, RoomId};

use super::errors::ProtocolError;

// ============================================
// Event Kinds
// ============================================

/// Closed set of signaling event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalEvent {
    Join,
    Leave,
    Offer,
    Answer,
    IceCandidate,
    PeersInRoom,
    PeerJoined,
    PeerLeft,
}

impl SignalEvent {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalEvent::Join => "join",
            SignalEvent::Leave => "leave",
            SignalEvent::Offer => "offer",
            SignalEvent::Answer => "answer",
            SignalEvent::IceCandidate => "ice-candidate",
            SignalEvent::PeersInRoom => "peers-in-room",
            SignalEvent::PeerJoined => "peer-joined",
            SignalEvent::PeerLeft => "peer-left",
        }
    }

    /// Parses a wire name. Returns `None` for event kinds this relay does not know.
    ///
    /// `disconnect` is accepted as an alias of `leave`; the browser client
    /// bundled with earlier relay versions sends it on page unload.
    pub fn from_wire(name: &str) -> Option<Self> {
        let event = match name {
            "join" => SignalEvent::Join,
            "leave" | "disconnect" => SignalEvent::Leave,
            "offer" => SignalEvent::Offer,
            "answer" => SignalEvent::Answer,
            "ice-candidate" => SignalEvent::IceCandidate,
            "peers-in-room" => SignalEvent::PeersInRoom,
            "peer-joined" => SignalEvent::PeerJoined,
            "peer-left" => SignalEvent::PeerLeft,
            _ => return None,
        };
        Some(event)
    }
}

impl fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three negotiation events relayed peer-to-peer without inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    IceCandidate,
}

impl RelayKind {
    pub fn as_event(&self) -> SignalEvent {
        match self {
            RelayKind::Offer => SignalEvent::Offer,
            RelayKind::Answer => SignalEvent::Answer,
            RelayKind::IceCandidate => SignalEvent::IceCandidate,
        }
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// Raw envelope as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    data: Value,
}

/// A decoded client frame, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// Enter a room (creating it if absent).
    Join {
        room: RoomId,
        peer: PeerId,
        name: Option<String>,
    },

    /// Leave a room. Both fields fall back to the connection's own membership.
    Leave {
        room: Option<RoomId>,
        peer: Option<PeerId>,
    },

    /// Offer/answer/candidate addressed to one peer of the room.
    Relay {
        kind: RelayKind,
        room: RoomId,
        target: PeerId,
    },

    /// An event this relay does not act on (unknown or server-originated).
    Ignored { event: String },
}

impl ClientRequest {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Malformed`] when the frame is not an envelope
    /// - [`ProtocolError::MissingField`] when the event lacks a required field
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(frame)?;

        let event = match SignalEvent::from_wire(&envelope.event) {
            Some(event) => event,
            None => {
                return Ok(ClientRequest::Ignored {
                    event: envelope.event,
                })
            }
        };

        let data = envelope.data.as_object();
        let request = match event {
            SignalEvent::Join => ClientRequest::Join {
                room: required_room(envelope.room)?,
                peer: required_peer(data, "peerId")?,
                name: string_field(data, "peerName")
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            },
            SignalEvent::Leave => ClientRequest::Leave {
                room: envelope.room.and_then(|room| RoomId::new(room).ok()),
                peer: string_field(data, "peerId").and_then(|id| PeerId::new(id).ok()),
            },
            SignalEvent::Offer => relay(RelayKind::Offer, envelope.room, data)?,
            SignalEvent::Answer => relay(RelayKind::Answer, envelope.room, data)?,
            SignalEvent::IceCandidate => relay(RelayKind::IceCandidate, envelope.room, data)?,
            SignalEvent::PeersInRoom | SignalEvent::PeerJoined | SignalEvent::PeerLeft => {
                ClientRequest::Ignored {
                    event: envelope.event,
                }
            }
        };
        Ok(request)
    }
}

fn relay(
    kind: RelayKind,
    room: Option<String>,
    data: Option<&Map<String, Value>>,
) -> Result<ClientRequest, ProtocolError> {
    Ok(ClientRequest::Relay {
        kind,
        room: required_room(room)?,
        target: required_peer(data, "target")?,
    })
}

fn string_field<'a>(data: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a str> {
    data?.get(key)?.as_str()
}

fn required_room(room: Option<String>) -> Result<RoomId, ProtocolError> {
    match room {
        Some(room) if !room.is_empty() => Ok(RoomId::new(room)?),
        _ => Err(ProtocolError::MissingField("room")),
    }
}

fn required_peer(
    data: Option<&Map<String, Value>>,
    key: &'static str,
) -> Result<PeerId, ProtocolError> {
    match string_field(data, key) {
        Some(id) if !id.is_empty() => Ok(PeerId::new(id)?),
        _ => Err(ProtocolError::MissingField(key)),
    }
}

// ============================================
// Server → Client Messages
// ============================================

/// Identity of a room member as reported to other members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub peer_id: PeerId,
    pub peer_name: String,
}

impl PeerInfo {
    /// Builds the info, falling back to the peer id when no display name was given.
    pub fn new(peer_id: PeerId, peer_name: Option<String>) -> Self {
        let peer_name = peer_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| peer_id.as_str().to_string());
        Self { peer_id, peer_name }
    }
}

/// A server-originated notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMessage {
    pub event: SignalEvent,
    pub room: RoomId,
    pub data: Value,
}

impl SignalMessage {
    /// Reply to a joiner listing every other member of the room.
    pub fn peers_in_room(room: &RoomId, peers: &[PeerInfo]) -> Self {
        Self {
            event: SignalEvent::PeersInRoom,
            room: room.clone(),
            data: json!({ "peers": peers }),
        }
    }

    /// Notification that a peer entered the room.
    pub fn peer_joined(room: &RoomId, peer: &PeerInfo) -> Self {
        Self {
            event: SignalEvent::PeerJoined,
            room: room.clone(),
            data: json!({
                "peerId": peer.peer_id,
                "peerName": peer.peer_name,
            }),
        }
    }

    /// Notification that a peer left the room.
    pub fn peer_left(room: &RoomId, peer_id: &PeerId) -> Self {
        Self {
            event: SignalEvent::PeerLeft,
            room: room.clone(),
            data: json!({ "peerId": peer_id }),
        }
    }

    /// Encodes the message as a text frame.
    pub fn to_frame(&self) -> String {
        json!({
            "event": self.event.as_str(),
            "room": self.room,
            "data": self.data,
        })
        .to_string()
    }
}
