//! Integration tests for the signaling relay.
//!
//! These tests run a real server on an ephemeral port and drive it with
//! WebSocket clients:
//! 1. Join, peer discovery and offer forwarding between two peers
//! 2. Cleanup when a client drops without leaving
//! 3. Protocol errors and unsupported frames
//! 4. Diagnostics and shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use signaling_relay::adapters::{RelayServer, ServerError};
use signaling_relay::application::RoomRegistry;
use signaling_relay::config::AppConfig;
use signaling_relay::domain::foundation::RoomId;

// =============================================================================
// Test Infrastructure
// =============================================================================

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct TestRelay {
    server: Arc<RelayServer>,
    addr: SocketAddr,
    handle: JoinHandle<Result<(), ServerError>>,
}

async fn start_relay() -> TestRelay {
    start_relay_with(AppConfig::default()).await
}

async fn start_relay_with(config: AppConfig) -> TestRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(RelayServer::new(config, Arc::new(RoomRegistry::new())));
    let handle = tokio::spawn({
        let server = server.clone();
        async move { server.serve(listener).await }
    });
    TestRelay {
        server,
        addr,
        handle,
    }
}

impl TestRelay {
    async fn connect(&self) -> Client {
        let (client, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("WebSocket handshake failed");
        client
    }

    async fn members(&self, room: &str) -> Option<Vec<String>> {
        self.server
            .registry()
            .snapshot()
            .await
            .get(&RoomId::new(room).unwrap())
            .map(|members| {
                members
                    .iter()
                    .map(|m| m.info.peer_id.as_str().to_string())
                    .collect()
            })
    }

    /// Polls until the room's member list satisfies `expected` (None = room gone).
    async fn wait_for_members(&self, room: &str, expected: Option<Vec<&str>>) {
        let expected: Option<Vec<String>> =
            expected.map(|ids| ids.into_iter().map(String::from).collect());
        for _ in 0..250 {
            if self.members(room).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "room {} never reached {:?}, last seen {:?}",
            room,
            expected,
            self.members(room).await
        );
    }
}

async fn send_json(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

async fn join(client: &mut Client, room: &str, peer: &str, name: Option<&str>) -> Value {
    let mut data = json!({ "peerId": peer });
    if let Some(name) = name {
        data["peerName"] = json!(name);
    }
    send_json(client, json!({ "event": "join", "room": room, "data": data })).await;
    let reply = recv_json(client).await;
    assert_eq!(reply["event"], "peers-in-room");
    reply
}

async fn recv_text(client: &mut Client) -> String {
    loop {
        let message = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended")
            .expect("WebSocket error");
        match message {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

async fn recv_json(client: &mut Client) -> Value {
    serde_json::from_str(&recv_text(client).await).unwrap()
}

async fn expect_closed(client: &mut Client) {
    loop {
        match tokio::time::timeout(WAIT, client.next())
            .await
            .expect("connection was not closed")
        {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => continue,
        }
    }
}

// =============================================================================
// Signaling Flow
// =============================================================================

#[tokio::test]
async fn two_peers_discover_each_other_and_exchange_offer() {
    let relay = start_relay().await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;

    let reply = join(&mut a, "r1", "A", None).await;
    assert_eq!(reply["room"], "r1");
    assert_eq!(reply["data"]["peers"], json!([]));

    let reply = join(&mut b, "r1", "B", Some("Bob")).await;
    assert_eq!(
        reply["data"]["peers"],
        json!([{ "peerId": "A", "peerName": "A" }])
    );

    let joined = recv_json(&mut a).await;
    assert_eq!(joined["event"], "peer-joined");
    assert_eq!(joined["data"], json!({ "peerId": "B", "peerName": "Bob" }));

    let offer = r#"{"event":"offer","room":"r1","data":{"target":"B","sdp":"v=0 X","extra":[1,2]}}"#;
    a.send(Message::Text(offer.to_string())).await.unwrap();
    assert_eq!(recv_text(&mut b).await, offer);

    let answer = r#"{"event":"answer","room":"r1","data":{"target":"A","sdp":"v=0 Y"}}"#;
    b.send(Message::Text(answer.to_string())).await.unwrap();
    assert_eq!(recv_text(&mut a).await, answer);
}

#[tokio::test]
async fn unclean_drop_notifies_remaining_peer_and_cleans_registry() {
    let relay = start_relay().await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;

    join(&mut a, "r1", "A", None).await;
    join(&mut b, "r1", "B", None).await;
    recv_json(&mut a).await; // peer-joined B

    drop(b);

    let left = recv_json(&mut a).await;
    assert_eq!(left["event"], "peer-left");
    assert_eq!(left["data"], json!({ "peerId": "B" }));
    assert_eq!(relay.members("r1").await, Some(vec!["A".to_string()]));

    drop(a);
    relay.wait_for_members("r1", None).await;
    assert_eq!(relay.server.registry().room_count().await, 0);
}

#[tokio::test]
async fn explicit_leave_notifies_and_closes_connection() {
    let relay = start_relay().await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;

    join(&mut a, "r1", "A", None).await;
    join(&mut b, "r1", "B", None).await;
    recv_json(&mut a).await;

    send_json(&mut b, json!({ "event": "leave", "room": "r1", "data": { "peerId": "B" } })).await;

    let left = recv_json(&mut a).await;
    assert_eq!(left["event"], "peer-left");
    expect_closed(&mut b).await;
}

#[tokio::test]
async fn offer_to_absent_target_is_dropped_silently() {
    let relay = start_relay().await;
    let mut a = relay.connect().await;
    join(&mut a, "r1", "A", None).await;

    send_json(
        &mut a,
        json!({ "event": "offer", "room": "r1", "data": { "target": "ghost", "sdp": "X" } }),
    )
    .await;

    // The connection stays usable: a later join in another room still answers.
    let reply = join(&mut a, "r2", "A", None).await;
    assert_eq!(reply["room"], "r2");
    relay.wait_for_members("r1", None).await;
}

#[tokio::test]
async fn rejoin_with_same_peer_id_replaces_old_connection() {
    let relay = start_relay().await;
    let mut watcher = relay.connect().await;
    let mut first = relay.connect().await;
    let mut second = relay.connect().await;

    join(&mut watcher, "r1", "W", None).await;
    join(&mut first, "r1", "A", None).await;
    recv_json(&mut watcher).await;
    join(&mut second, "r1", "A", None).await;
    recv_json(&mut watcher).await;

    // The stale connection going away must not evict the new holder of "A".
    drop(first);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        relay.members("r1").await,
        Some(vec!["A".to_string(), "W".to_string()])
    );

    let offer = r#"{"event":"offer","room":"r1","data":{"target":"A","sdp":"X"}}"#;
    watcher.send(Message::Text(offer.to_string())).await.unwrap();
    assert_eq!(recv_text(&mut second).await, offer);
}

// =============================================================================
// Protocol Errors
// =============================================================================

#[tokio::test]
async fn malformed_frame_closes_connection_and_leaves_room() {
    let relay = start_relay().await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;

    join(&mut a, "r1", "A", None).await;
    join(&mut b, "r1", "B", None).await;
    recv_json(&mut a).await;

    b.send(Message::Text("this is not json".to_string())).await.unwrap();

    expect_closed(&mut b).await;
    let left = recv_json(&mut a).await;
    assert_eq!(left["event"], "peer-left");
}

#[tokio::test]
async fn missing_field_and_binary_frames_keep_connection_open() {
    let relay = start_relay().await;
    let mut a = relay.connect().await;

    send_json(&mut a, json!({ "event": "join", "room": "r1", "data": {} })).await;
    a.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    send_json(&mut a, json!({ "event": "renegotiate", "room": "r1" })).await;

    let reply = join(&mut a, "r1", "A", None).await;
    assert_eq!(reply["data"]["peers"], json!([]));
}

#[tokio::test]
async fn hex_room_policy_rejects_other_room_ids() {
    let mut config = AppConfig::default();
    config.relay.require_hex_room_ids = true;
    let relay = start_relay_with(config).await;
    let mut a = relay.connect().await;

    send_json(
        &mut a,
        json!({ "event": "join", "room": "lobby", "data": { "peerId": "A" } }),
    )
    .await;
    let reply = join(&mut a, "00ff00ff00ff00ff", "A", None).await;

    assert_eq!(reply["room"], "00ff00ff00ff00ff");
    assert_eq!(relay.members("lobby").await, None);
}

// =============================================================================
// Diagnostics and Lifecycle
// =============================================================================

#[tokio::test]
async fn rooms_endpoint_reflects_live_membership() {
    let relay = start_relay().await;
    let mut a = relay.connect().await;
    join(&mut a, "r1", "A", Some("Alice")).await;

    let response = relay
        .server
        .router()
        .oneshot(Request::builder().uri("/rooms").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let rooms: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(rooms["r1"][0]["peerId"], "A");
    assert_eq!(rooms["r1"][0]["peerName"], "Alice");
}

#[tokio::test]
async fn stop_closes_connections_and_empties_registry() {
    let relay = start_relay().await;
    let mut a = relay.connect().await;
    join(&mut a, "r1", "A", None).await;

    relay.server.stop();

    expect_closed(&mut a).await;
    relay.wait_for_members("r1", None).await;
    let result = tokio::time::timeout(WAIT, relay.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
