//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the relay core and the outside world. Adapters implement these ports.
//!
//! ## Transport Ports
//!
//! - `PeerChannel` - Non-blocking push of text frames to one connected client

mod peer_channel;

pub use peer_channel::{DeliveryError, PeerChannel, PeerChannelRef};
