//! Signaling Relay - WebSocket rendezvous for peer-to-peer clients
//!
//! Clients join named rooms, learn who else is present and exchange
//! offer/answer/ICE-candidate messages through the relay until they can talk
//! to each other directly. The relay never inspects negotiation payloads.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
