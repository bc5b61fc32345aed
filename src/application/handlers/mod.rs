//! Application handlers.
//!
//! Route client signaling frames onto room operations.

mod signaling;

pub use signaling::{ConnectionSession, ConnectionState, DispatchOutcome, SignalingRouter};
