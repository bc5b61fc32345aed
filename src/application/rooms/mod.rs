//! Rooms - membership state and fan-out for signaling rooms.

mod registry;
mod room;

pub use registry::{RegistrySnapshot, RoomRegistry};
pub use room::{
    ForwardOutcome, JoinOutcome, LeaveOutcome, MemberSnapshot, PeerSlot, Room, RoomClosed,
};
