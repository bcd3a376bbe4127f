//! Spotify catalog provider.
//!
//! Runs the real client-credentials (or refresh-token) flow against the
//! Spotify accounts service, but serves search results from a built-in demo
//! catalog: the Web API gates most playback-adjacent endpoints behind premium
//! subscriptions, so this variant doubles as the stand-in data source.

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::{MusicProvider, ProviderError, SearchResult, Service};
use async_trait::async_trait;

const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh this long before the reported expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const MAX_RESULTS: usize = 8;
const FALLBACK_RESULTS: usize = 5;

struct DemoTrack {
    id: &'static str,
    title: &'static str,
    artist: &'static str,
    album: &'static str,
    duration: i64,
}

const DEMO_CATALOG: &[DemoTrack] = &[
    DemoTrack { id: "spotify_1", title: "Bohemian Rhapsody", artist: "Queen", album: "A Night at the Opera", duration: 355 },
    DemoTrack { id: "spotify_2", title: "Hotel California", artist: "Eagles", album: "Hotel California", duration: 391 },
    DemoTrack { id: "spotify_3", title: "Stairway to Heaven", artist: "Led Zeppelin", album: "Led Zeppelin IV", duration: 482 },
    DemoTrack { id: "spotify_4", title: "Sweet Child O' Mine", artist: "Guns N' Roses", album: "Appetite for Destruction", duration: 356 },
    DemoTrack { id: "spotify_5", title: "Billie Jean", artist: "Michael Jackson", album: "Thriller", duration: 294 },
    DemoTrack { id: "spotify_6", title: "Like a Rolling Stone", artist: "Bob Dylan", album: "Highway 61 Revisited", duration: 370 },
    DemoTrack { id: "spotify_7", title: "Smells Like Teen Spirit", artist: "Nirvana", album: "Nevermind", duration: 301 },
    DemoTrack { id: "spotify_8", title: "Yesterday", artist: "The Beatles", album: "Help!", duration: 125 },
    DemoTrack { id: "spotify_9", title: "Purple Haze", artist: "Jimi Hendrix", album: "Are You Experienced", duration: 170 },
    DemoTrack { id: "spotify_10", title: "Good Vibrations", artist: "The Beach Boys", album: "Pet Sounds", duration: 217 },
];

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: Option<String>,
    token_url: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl SpotifyProvider {
    pub fn new(client_id: String, client_secret: String, refresh_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            client_id,
            client_secret,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            token: Mutex::new(None),
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("SPOTIFY_CLIENT_ID").unwrap_or_default(),
            std::env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_default(),
            std::env::var("SPOTIFY_REFRESH_TOKEN").ok(),
        )
    }

    #[cfg(test)]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    async fn ensure_token(&self) -> Result<(), ProviderError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ProviderError::MissingCredentials("spotify"));
        }

        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(());
            }
        }

        let credentials = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
        let form: Vec<(&str, &str)> = match &self.refresh_token {
            Some(refresh) => vec![("grant_type", "refresh_token"), ("refresh_token", refresh)],
            None => vec![("grant_type", "client_credentials")],
        };

        let response = self
            .client
            .post(&self.token_url)
            .header(AUTHORIZATION, format!("Basic {}", credentials))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::UnexpectedResponse(format!(
                "token refresh failed with status {}",
                response.status()
            )));
        }

        let body: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *token = Some(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + lifetime,
        });
        debug!("spotify access token refreshed");
        Ok(())
    }

    fn to_result(track: &DemoTrack) -> SearchResult {
        SearchResult {
            id: track.id.to_string(),
            title: track.title.to_string(),
            artist: track.artist.to_string(),
            album: Some(track.album.to_string()),
            service: Service::Spotify,
            duration: track.duration,
            thumbnail: Some(format!("https://picsum.photos/300/300?random={}", track.id)),
        }
    }
}

#[async_trait]
impl MusicProvider for SpotifyProvider {
    fn service(&self) -> Service {
        Service::Spotify
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let query_lower = query.to_lowercase();

        let matches: Vec<SearchResult> = DEMO_CATALOG
            .iter()
            .filter(|track| {
                track.title.to_lowercase().contains(&query_lower)
                    || track.artist.to_lowercase().contains(&query_lower)
                    || track.album.to_lowercase().contains(&query_lower)
            })
            .take(MAX_RESULTS)
            .map(Self::to_result)
            .collect();

        // No match on a non-empty query: fall back to the popular entries so
        // the demo source always has something to show.
        if matches.is_empty() && !query_lower.is_empty() {
            return Ok(DEMO_CATALOG
                .iter()
                .take(FALLBACK_RESULTS)
                .map(Self::to_result)
                .collect());
        }

        Ok(matches)
    }

    async fn is_authenticated(&self) -> bool {
        self.ensure_token().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn token_is_fetched_once_and_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler_hits = Arc::clone(&hits);
        let router = Router::new().route(
            "/token",
            post(move || {
                let hits = Arc::clone(&handler_hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({"access_token": "abc", "expires_in": 3600}))
                }
            }),
        );
        let base = serve(router).await;

        let provider = SpotifyProvider::new("id".into(), "secret".into(), None)
            .with_token_url(format!("{}/token", base));
        assert!(provider.is_authenticated().await);
        assert!(provider.is_authenticated().await);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_token_request_means_not_authenticated() {
        let router = Router::new().route(
            "/token",
            post(|| async { axum::http::StatusCode::UNAUTHORIZED }),
        );
        let base = serve(router).await;

        let provider = SpotifyProvider::new("id".into(), "secret".into(), None)
            .with_token_url(format!("{}/token", base));
        assert!(!provider.is_authenticated().await);
    }

    #[tokio::test]
    async fn search_matches_title_case_insensitively() {
        let provider = SpotifyProvider::new("id".into(), "secret".into(), None);
        let results = provider.search("yesterday").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Yesterday");
        assert_eq!(results[0].artist, "The Beatles");
        assert_eq!(results[0].service, Service::Spotify);
    }

    #[tokio::test]
    async fn search_matches_on_artist_and_album() {
        let provider = SpotifyProvider::new("id".into(), "secret".into(), None);

        let by_artist = provider.search("nirvana").await.unwrap();
        assert_eq!(by_artist[0].title, "Smells Like Teen Spirit");

        let by_album = provider.search("thriller").await.unwrap();
        assert_eq!(by_album[0].title, "Billie Jean");
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_popular_entries() {
        let provider = SpotifyProvider::new("id".into(), "secret".into(), None);
        let results = provider.search("zzz no such track").await.unwrap();

        assert_eq!(results.len(), FALLBACK_RESULTS);
        assert_eq!(results[0].title, "Bohemian Rhapsody");
    }

    #[tokio::test]
    async fn is_authenticated_false_without_credentials() {
        let provider = SpotifyProvider::new(String::new(), String::new(), None);
        assert!(!provider.is_authenticated().await);
    }
}
