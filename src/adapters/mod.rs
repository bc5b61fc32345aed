//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the relay core to the outside world:
//! - `websocket` - `PeerChannel` over WebSocket connections, upgrade handler
//! - `http` - Server lifecycle, routing, diagnostics
//! - `in_memory` - Recording `PeerChannel` for tests

pub mod http;
pub mod in_memory;
pub mod websocket;

pub use http::{RelayServer, ServerError};
pub use in_memory::RecordingPeerChannel;
pub use websocket::{ConnectionSettings, WebSocketPeerChannel};
