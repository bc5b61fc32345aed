//! Domain layer containing the relay's vocabulary types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (identifiers, timestamps, errors)
//! - `signaling` - Wire envelope, event kinds and protocol errors

pub mod foundation;
pub mod signaling;
