//! Signaling wire model.
//!
//! Decodes client envelopes into [`ClientRequest`]s and builds the
//! server-originated [`SignalMessage`] notifications.

mod errors;
mod messages;

pub use errors::ProtocolError;
pub use messages::{ClientRequest, PeerInfo, RelayKind, SignalEvent, SignalMessage};
