//! Diagnostic HTTP endpoints.
//!
//! - `GET /rooms` - JSON map of room id to members
//! - `GET /health` - liveness probe

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::application::{RegistrySnapshot, RoomRegistry};

/// List every room with its current members.
///
/// ```json
/// { "r1": [ { "peerId": "A", "peerName": "Alice", "joinedAt": "..." } ] }
/// ```
pub async fn list_rooms(State(registry): State<Arc<RoomRegistry>>) -> Json<RegistrySnapshot> {
    Json(registry.snapshot().await)
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Create the diagnostics router.
pub fn diagnostics_router() -> Router<Arc<RoomRegistry>> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/health", get(health))
}
