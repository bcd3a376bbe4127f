//! Music catalog providers.
//!
//! Every external catalog is exposed through the same capability surface so
//! the aggregator never has to special-case a service beyond its ranking bias.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod apple;
mod spotify;
mod youtube;

pub use apple::AppleMusicProvider;
pub use spotify::SpotifyProvider;
pub use youtube::YouTubeProvider;

/// The catalogs known to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Spotify,
    Youtube,
    Apple,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Spotify => "spotify",
            Service::Youtube => "youtube",
            Service::Apple => "apple",
        }
    }

    pub fn parse(s: &str) -> Option<Service> {
        match s {
            "spotify" => Some(Service::Spotify),
            "youtube" => Some(Service::Youtube),
            "apple" => Some(Service::Apple),
            _ => None,
        }
    }

    pub fn all() -> [Service; 3] {
        [Service::Spotify, Service::Youtube, Service::Apple]
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single hit from one catalog. Ephemeral: produced per search call,
/// never persisted. Identity is `(service, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Track identifier in the originating catalog's namespace.
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub service: Service,
    /// Duration in whole seconds.
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} credentials not configured")]
    MissingCredentials(&'static str),
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected upstream response: {0}")]
    UnexpectedResponse(String),
}

/// Uniform capability surface over one external catalog.
///
/// The playback control methods are accepted stubs: the authoritative
/// "now playing" lives in the queue manager, but the surface exists so a
/// provider can be upgraded to real device control without touching the
/// aggregator.
#[async_trait]
pub trait MusicProvider: Send + Sync {
    fn service(&self) -> Service;

    /// Search the catalog. Errors are absorbed by the aggregator, never
    /// surfaced past it.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError>;

    /// Cheap capability probe. Must not fail; any error resolves to `false`.
    async fn is_authenticated(&self) -> bool;

    async fn add_to_queue(&self, _track_id: &str) -> Result<bool, ProviderError> {
        Ok(true)
    }

    async fn play_track(&self, _track_id: &str) -> Result<bool, ProviderError> {
        Ok(true)
    }

    async fn get_current_track(&self) -> Result<Option<SearchResult>, ProviderError> {
        Ok(None)
    }

    async fn pause_playback(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn skip_track(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_round_trips_through_str() {
        for service in Service::all() {
            assert_eq!(Service::parse(service.as_str()), Some(service));
        }
        assert_eq!(Service::parse("tidal"), None);
    }

    #[test]
    fn service_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Service::Youtube).unwrap(),
            "\"youtube\""
        );
    }
}
