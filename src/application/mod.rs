//! Application layer - Rooms and signaling handlers.
//!
//! This layer owns the shared membership state and turns decoded client
//! requests into room operations.

pub mod handlers;
pub mod rooms;

pub use handlers::{ConnectionSession, ConnectionState, DispatchOutcome, SignalingRouter};
pub use rooms::{
    ForwardOutcome, JoinOutcome, LeaveOutcome, MemberSnapshot, RegistrySnapshot, Room,
    RoomClosed, RoomRegistry,
};
