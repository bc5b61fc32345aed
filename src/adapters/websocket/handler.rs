//! WebSocket upgrade handler for signaling connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Upgrade to WebSocket with the configured message size limit
//! 2. Start the writer task behind a bounded outbound queue
//! 3. Dispatch each text frame through the signaling router
//! 4. Stop on close, read error, writer failure, protocol error or shutdown
//! 5. Leave the room the connection still belongs to

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::StreamExt;
use tokio::sync::watch;

use crate::application::{ConnectionSession, DispatchOutcome, SignalingRouter};
use crate::config::RelayConfig;
use crate::ports::PeerChannel;

use super::channel::{run_writer, WebSocketPeerChannel};

/// Per-connection transport limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Frames that may wait for the writer before deliveries fail.
    pub send_queue_capacity: usize,
    /// Upper bound on a single socket write.
    pub write_timeout: Duration,
    /// Largest inbound message accepted.
    pub max_message_bytes: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            send_queue_capacity: 64,
            write_timeout: Duration::from_millis(5000),
            max_message_bytes: 64 * 1024,
        }
    }
}

impl From<&RelayConfig> for ConnectionSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            send_queue_capacity: config.send_queue_capacity,
            write_timeout: config.write_timeout(),
            max_message_bytes: config.max_message_bytes,
        }
    }
}

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub router: Arc<SignalingRouter>,
    pub settings: ConnectionSettings,
    /// Flips to `true` when the server is stopping.
    pub shutdown: watch::Receiver<bool>,
}

impl WebSocketState {
    pub fn new(
        router: Arc<SignalingRouter>,
        settings: ConnectionSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            router,
            settings,
            shutdown,
        }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.max_message_size(state.settings.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run one established connection to completion.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (sink, mut stream) = socket.split();
    let settings = state.settings;

    let (channel, outbound) = WebSocketPeerChannel::new(settings.send_queue_capacity);
    let connection_id = channel.connection_id();
    let mut writer = tokio::spawn(run_writer(
        sink,
        outbound,
        settings.write_timeout,
        connection_id,
    ));
    let mut writer_done = false;

    let mut session = ConnectionSession::new(Arc::new(channel));
    session.start();
    let mut shutdown = state.shutdown.clone();
    let already_stopping = *shutdown.borrow_and_update();

    tracing::info!(connection = %connection_id, "Connection opened");

    if !already_stopping {
        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if state.router.dispatch(&mut session, &text).await == DispatchOutcome::Close {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!(
                            connection = %connection_id,
                            "Received unsupported binary message"
                        );
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Handled automatically by axum
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection = %connection_id, "Client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(connection = %connection_id, "Receive error: {}", e);
                        break;
                    }
                },
                exit = &mut writer => {
                    writer_done = true;
                    tracing::debug!(connection = %connection_id, exit = ?exit, "Writer stopped");
                    break;
                }
                _ = shutdown.changed() => {
                    tracing::debug!(connection = %connection_id, "Server stopping, closing connection");
                    break;
                }
            }
        }
    }

    state.router.disconnect(&mut session).await;
    drop(session);

    // The room no longer holds the channel, so the writer drains and closes.
    if !writer_done
        && tokio::time::timeout(settings.write_timeout, &mut writer)
            .await
            .is_err()
    {
        writer.abort();
    }

    tracing::info!(connection = %connection_id, "Connection closed");
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router().with_state(ws_state));
/// ```
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}
