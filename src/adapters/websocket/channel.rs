//! WebSocket-backed peer channel and its writer task.
//!
//! Rooms enqueue frames onto a bounded queue without blocking; a single
//! writer task per connection drains the queue into the socket, so writes to
//! one socket never interleave. Each socket write is bounded by a timeout and
//! a stalled client is dropped instead of holding up the room.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::foundation::ConnectionId;
use crate::ports::{DeliveryError, PeerChannel};

/// Outbound half of one WebSocket connection.
#[derive(Debug, Clone)]
pub struct WebSocketPeerChannel {
    connection_id: ConnectionId,
    outbound: mpsc::Sender<String>,
}

impl WebSocketPeerChannel {
    /// Create a channel with a queue of `capacity` frames.
    ///
    /// Returns the channel and the receiver to hand to [`run_writer`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let channel = Self {
            connection_id: ConnectionId::new(),
            outbound,
        };
        (channel, rx)
    }
}

impl PeerChannel for WebSocketPeerChannel {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn deliver(&self, frame: String) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Why a writer task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// Every channel handle was dropped and the queue drained.
    Drained,
    /// A socket write exceeded the write timeout.
    TimedOut,
    /// The socket rejected a write.
    Failed,
}

/// Drain `frames` into `sink` until the queue closes or the socket fails.
///
/// On a clean drain a close frame is sent before returning.
pub async fn run_writer<S>(
    mut sink: S,
    mut frames: mpsc::Receiver<String>,
    write_timeout: Duration,
    connection_id: ConnectionId,
) -> WriterExit
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = frames.recv().await {
        match tokio::time::timeout(write_timeout, sink.send(Message::Text(frame))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(connection = %connection_id, "Socket write failed: {}", e);
                return WriterExit::Failed;
            }
            Err(_) => {
                tracing::warn!(
                    connection = %connection_id,
                    timeout_ms = write_timeout.as_millis() as u64,
                    "Socket write timed out, dropping connection"
                );
                return WriterExit::TimedOut;
            }
        }
    }

    let _ = tokio::time::timeout(write_timeout, sink.send(Message::Close(None))).await;
    WriterExit::Drained
}
