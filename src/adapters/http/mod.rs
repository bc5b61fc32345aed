//! HTTP adapters - server lifecycle and diagnostic endpoints.

pub mod diagnostics;
pub mod server;

// Re-export key types for convenience
pub use diagnostics::diagnostics_router;
pub use server::{RelayServer, ServerError};
