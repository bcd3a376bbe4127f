use serde::Serialize;

use crate::queue_store::Track;

/// Snapshot of the queue as shown to users and observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub current_track: Option<Track>,
    pub upcoming: Vec<Track>,
    pub total_tracks: usize,
}

/// Snapshot of playback progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub is_playing: bool,
    /// Elapsed seconds into the current track, capped to its duration.
    pub current_time: i64,
    pub duration: i64,
    pub track: Option<Track>,
}

impl PlaybackStatus {
    pub fn idle() -> Self {
        Self {
            is_playing: false,
            current_time: 0,
            duration: 0,
            track: None,
        }
    }
}
