//! PeerChannel port - Outbound half of a client's transport connection.
//!
//! Rooms hold one `PeerChannel` per member and push text frames through it
//! from whichever task is handling the triggering message. Implementations
//! must make `deliver` non-blocking and must serialize writes to the
//! underlying transport themselves.
//!
//! ## Use Case
//!
//! 1. Peer B's connection is accepted; the transport creates B's channel
//! 2. B joins room `r1`; the room stores B's channel under B's peer id
//! 3. Peer A sends an offer targeting B from A's own connection task
//! 4. Room `r1` looks up B's channel and calls `deliver` with A's frame
//! 5. B's transport writes the frame to B's socket in its own writer task

use std::fmt;
use std::sync::Arc;

use crate::domain::foundation::ConnectionId;

/// Errors that can occur when handing a frame to a peer's transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The peer's outbound queue is full (slow or stalled reader).
    #[error("Outbound queue full")]
    QueueFull,

    /// The peer's transport has already shut down.
    #[error("Connection closed")]
    Closed,
}

/// Port for pushing frames to one connected client.
///
/// # Example
///
/// ```ignore
/// // Fan-out without short-circuiting on a failed member:
/// for member in members {
///     if let Err(e) = member.deliver(frame.clone()) {
///         tracing::warn!(connection = %member.connection_id(), "delivery failed: {}", e);
///     }
/// }
/// ```
pub trait PeerChannel: Send + Sync {
    /// Identity of the transport connection behind this channel.
    fn connection_id(&self) -> ConnectionId;

    /// Enqueue a text frame for delivery.
    ///
    /// Must not block. Returns an error when the frame cannot be accepted;
    /// callers treat that the same as the peer being unreachable.
    fn deliver(&self, frame: String) -> Result<(), DeliveryError>;
}

impl fmt::Debug for dyn PeerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerChannel")
            .field("connection_id", &self.connection_id())
            .finish()
    }
}

/// Shared handle to a peer channel.
pub type PeerChannelRef = Arc<dyn PeerChannel>;
