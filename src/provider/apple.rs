//! Apple Music catalog provider.
//!
//! Developer-token bearer REST transport against the Apple Music catalog
//! search endpoint.

use std::time::Duration;

use serde::Deserialize;

use super::{MusicProvider, ProviderError, SearchResult, Service};
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://api.music.apple.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_LIMIT: usize = 25;

pub struct AppleMusicProvider {
    client: reqwest::Client,
    developer_token: String,
    base_url: String,
}

#[derive(Deserialize)]
struct CatalogSearchResponse {
    results: Option<CatalogResults>,
}

#[derive(Deserialize)]
struct CatalogResults {
    songs: Option<SongsContainer>,
}

#[derive(Deserialize)]
struct SongsContainer {
    #[serde(default)]
    data: Vec<Song>,
}

#[derive(Deserialize)]
struct Song {
    id: String,
    attributes: SongAttributes,
}

#[derive(Deserialize)]
struct SongAttributes {
    name: String,
    #[serde(rename = "artistName")]
    artist_name: String,
    #[serde(rename = "albumName")]
    album_name: Option<String>,
    #[serde(rename = "durationInMillis")]
    duration_in_millis: Option<i64>,
    artwork: Option<Artwork>,
}

#[derive(Deserialize)]
struct Artwork {
    url: Option<String>,
}

impl AppleMusicProvider {
    pub fn new(developer_token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            developer_token,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Self {
        let token = std::env::var("APPLE_MUSIC_API_KEY")
            .or_else(|_| std::env::var("APPLE_DEVELOPER_TOKEN"))
            .unwrap_or_default();
        Self::new(token)
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl MusicProvider for AppleMusicProvider {
    fn service(&self) -> Service {
        Service::Apple
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        if self.developer_token.is_empty() {
            return Err(ProviderError::MissingCredentials("apple"));
        }

        let url = format!(
            "{}/catalog/us/search?term={}&types=songs&limit={}",
            self.base_url,
            urlencoding::encode(query),
            SEARCH_LIMIT
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.developer_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::UnexpectedResponse(format!(
                "catalog search returned status {}",
                response.status()
            )));
        }

        let body: CatalogSearchResponse = response.json().await?;
        let songs = body
            .results
            .and_then(|r| r.songs)
            .map(|s| s.data)
            .unwrap_or_default();

        let results = songs
            .into_iter()
            .map(|song| SearchResult {
                id: song.id,
                title: song.attributes.name,
                artist: song.attributes.artist_name,
                album: song.attributes.album_name,
                service: Service::Apple,
                duration: song.attributes.duration_in_millis.unwrap_or(0) / 1000,
                thumbnail: song
                    .attributes
                    .artwork
                    .and_then(|a| a.url)
                    .map(expand_artwork_url),
            })
            .collect();

        Ok(results)
    }

    async fn is_authenticated(&self) -> bool {
        !self.developer_token.is_empty()
    }
}

/// Apple returns artwork urls with `{w}`/`{h}` placeholders for the caller
/// to fill in.
fn expand_artwork_url(url: String) -> String {
    url.replace("{w}", "300").replace("{h}", "300")
}
