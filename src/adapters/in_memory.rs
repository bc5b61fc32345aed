//! In-memory peer channel for testing.
//!
//! Records every delivered frame so room and router behavior can be asserted
//! without a socket.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in production.
//! It uses `.expect()` on lock operations which will panic if locks are poisoned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::domain::foundation::ConnectionId;
use crate::ports::{DeliveryError, PeerChannel};

/// Peer channel that captures frames in memory.
///
/// # Example
///
/// ```ignore
/// let channel = Arc::new(RecordingPeerChannel::new());
/// room.join(peer_id, None, channel.clone()).await?;
/// assert_eq!(channel.messages()[0]["event"], "peers-in-room");
/// ```
#[derive(Debug)]
pub struct RecordingPeerChannel {
    connection_id: ConnectionId,
    frames: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl RecordingPeerChannel {
    /// Creates an open channel with a fresh connection id.
    pub fn new() -> Self {
        Self {
            connection_id: ConnectionId::new(),
            frames: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    // === Test Helpers ===

    /// Makes every later delivery fail with [`DeliveryError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns and clears the captured frames.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn take_frames(&self) -> Vec<String> {
        std::mem::take(
            &mut *self
                .frames
                .lock()
                .expect("RecordingPeerChannel: frames lock poisoned"),
        )
    }

    /// Returns the captured frames parsed as JSON, without clearing them.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned or a frame is not JSON.
    pub fn messages(&self) -> Vec<Value> {
        self.frames
            .lock()
            .expect("RecordingPeerChannel: frames lock poisoned")
            .iter()
            .map(|frame| serde_json::from_str(frame).expect("captured frame is not JSON"))
            .collect()
    }

    /// Returns the `event` names of captured frames in order.
    pub fn events(&self) -> Vec<String> {
        self.messages()
            .iter()
            .map(|m| m["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Default for RecordingPeerChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerChannel for RecordingPeerChannel {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn deliver(&self, frame: String) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DeliveryError::Closed);
        }
        self.frames
            .lock()
            .expect("RecordingPeerChannel: frames lock poisoned")
            .push(frame);
        Ok(())
    }
}
