//! Foundation module - Shared domain primitives.
//!
//! Contains the identifiers, timestamps and validation errors that form the
//! vocabulary of the signaling relay.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ConnectionId, PeerId, RoomId, HEX_ROOM_ID_LEN};
pub use timestamp::Timestamp;
