//! WebSocket message types.
//!
//! One envelope format carries every broadcast: an event name plus a JSON
//! payload, so new event kinds never change the wire shape.

use serde::{Deserialize, Serialize};

/// Event names broadcast to observers.
pub mod events {
    /// The pending queue changed (add, remove, reorder, clear, advance).
    pub const QUEUE_UPDATED: &str = "queue_updated";
    /// The current track changed; payload is the new track or null.
    pub const TRACK_CHANGED: &str = "track_changed";
    /// Playback state changed (play, pause, advance).
    pub const PLAYBACK_STATUS: &str = "playback_status";
}

/// Server -> observer message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    pub event: String,
    pub data: serde_json::Value,
}

impl ServerMessage {
    pub fn new(event: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            event: event.into(),
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }
}
