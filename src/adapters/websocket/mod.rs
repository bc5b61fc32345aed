//! WebSocket transport for signaling clients.
//!
//! # Architecture
//!
//! ```text
//!   client socket
//!    │        ▲
//!    │ read   │ write (one writer task, bounded queue, write timeout)
//!    ▼        │
//! ┌─────────────────┐  deliver()  ┌──────────────────────┐
//! │   ws_handler    │◄────────────│  Room (any task)     │
//! │  read loop      │             └──────────────────────┘
//! └─────────────────┘                       ▲
//!          │ dispatch()                     │ join/leave/forward
//!          ▼                                │
//! ┌─────────────────────────────────────────┴────────────┐
//! │                  SignalingRouter                      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`channel`] - `PeerChannel` over a bounded queue plus the writer task
//! - [`handler`] - Axum WebSocket upgrade handler and read loop

pub mod channel;
pub mod handler;

pub use channel::{run_writer, WebSocketPeerChannel, WriterExit};
pub use handler::{websocket_router, ws_handler, ConnectionSettings, WebSocketState};
