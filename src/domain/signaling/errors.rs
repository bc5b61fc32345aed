//! Protocol errors raised while decoding client frames.

use thiserror::Error;

use crate::domain::foundation::ValidationError;

/// A client frame that cannot be routed.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not a JSON signaling envelope at all.
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A field the event requires is absent or has the wrong type.
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// A field is present but fails validation.
    #[error("Invalid field: {0}")]
    Invalid(#[from] ValidationError),
}

impl ProtocolError {
    /// Whether the connection must be closed rather than the single frame dropped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::Malformed(_))
    }
}
