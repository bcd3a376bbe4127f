use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::Service;

/// Lifecycle of a queued track. `Pending` tracks form the upcoming queue;
/// the other states are terminal except `Playing`, which only one track
/// holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Pending,
    Playing,
    Played,
    Skipped,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Pending => "pending",
            TrackStatus::Playing => "playing",
            TrackStatus::Played => "played",
            TrackStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<TrackStatus> {
        match s {
            "pending" => Some(TrackStatus::Pending),
            "playing" => Some(TrackStatus::Playing),
            "played" => Some(TrackStatus::Played),
            "skipped" => Some(TrackStatus::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackStatus::Played | TrackStatus::Skipped)
    }
}

/// A track that has been added to the venue queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: i64,
    /// Identifier in the originating catalog's namespace.
    pub track_id: String,
    pub service: Service,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Duration in whole seconds.
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub position: i64,
    pub status: TrackStatus,
}

/// Payload for adding a track to the queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrack {
    pub track_id: String,
    pub service: Service,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    pub duration: i64,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_requested_by")]
    pub requested_by: String,
}

fn default_requested_by() -> String {
    "anonymous".to_string()
}

/// Per-service venue configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueSetting {
    pub id: i64,
    pub service_name: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Partial update to a venue setting. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueSettingUpdate {
    pub is_active: Option<bool>,
    pub auth_token: Option<String>,
}
