//! YouTube catalog provider.
//!
//! API-key REST transport. Search results are post-filtered by duration:
//! anything over ten minutes is assumed to be a mix, concert or podcast
//! rather than a song, and dropped.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use super::{MusicProvider, ProviderError, SearchResult, Service};
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Results longer than this are treated as non-music and dropped.
const MAX_TRACK_SECONDS: i64 = 600;

pub struct YouTubeProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    medium: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Deserialize)]
struct ContentDetails {
    duration: String,
}

impl YouTubeProvider {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Self {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();
        Self::new(api_key)
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_durations(&self, video_ids: &[String]) -> Result<HashMap<String, i64>, ProviderError> {
        let url = format!(
            "{}/videos?part=contentDetails&id={}&key={}",
            self.base_url,
            video_ids.join(","),
            self.api_key
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::UnexpectedResponse(format!(
                "videos endpoint returned status {}",
                response.status()
            )));
        }

        let body: VideosResponse = response.json().await?;
        Ok(body
            .items
            .into_iter()
            .map(|item| (item.id, parse_iso8601_duration(&item.content_details.duration)))
            .collect())
    }
}

#[async_trait]
impl MusicProvider for YouTubeProvider {
    fn service(&self) -> Service {
        Service::Youtube
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingCredentials("youtube"));
        }

        // Bias the query toward music content.
        let music_query = format!("{} music OR song OR audio", query);
        let url = format!(
            "{}/search?part=snippet&q={}&type=video&videoCategoryId=10&videoSyndicated=true&videoDuration=medium&maxResults=20&key={}",
            self.base_url,
            urlencoding::encode(&music_query),
            self.api_key
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::UnexpectedResponse(format!(
                "search endpoint returned status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        let items: Vec<(String, Snippet)> = body
            .items
            .into_iter()
            .filter_map(|item| Some((item.id.video_id?, item.snippet)))
            .collect();
        if items.is_empty() {
            return Ok(vec![]);
        }

        let video_ids: Vec<String> = items.iter().map(|(id, _)| id.clone()).collect();
        let durations = self.fetch_durations(&video_ids).await?;

        let results = items
            .into_iter()
            .filter_map(|(video_id, snippet)| {
                let duration = durations.get(&video_id).copied().unwrap_or(0);
                if duration > MAX_TRACK_SECONDS {
                    return None;
                }

                let (artist, title) = split_video_title(&snippet.title);
                Some(SearchResult {
                    id: video_id,
                    title,
                    artist: artist.unwrap_or(snippet.channel_title),
                    album: None,
                    service: Service::Youtube,
                    duration,
                    thumbnail: snippet.thumbnails.medium.map(|t| t.url),
                })
            })
            .collect();

        Ok(results)
    }

    async fn is_authenticated(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Parse an ISO-8601 duration of the `PT#H#M#S` shape into seconds.
fn parse_iso8601_duration(duration: &str) -> i64 {
    let Some(rest) = duration.strip_prefix("PT") else {
        return 0;
    };

    let mut total = 0i64;
    let mut number = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else {
            let value: i64 = number.parse().unwrap_or(0);
            number.clear();
            total += match c {
                'H' => value * 3600,
                'M' => value * 60,
                'S' => value,
                _ => 0,
            };
        }
    }
    total
}

/// Split a video title into (artist, track title).
///
/// Uploaders encode the artist in the title with a handful of common
/// separators; the channel title is the fallback artist when none match.
fn split_video_title(title: &str) -> (Option<String>, String) {
    if let Some((artist, track)) = title.split_once(" - ") {
        return (Some(artist.trim().to_string()), track.trim().to_string());
    }
    if let Some((artist, track)) = title.split_once(": ") {
        return (Some(artist.trim().to_string()), track.trim().to_string());
    }
    // "Title by Artist" reverses the order.
    if let Some(idx) = title.to_lowercase().find(" by ") {
        let track = &title[..idx];
        let artist = &title[idx + 4..];
        if !track.trim().is_empty() && !artist.trim().is_empty() {
            return (Some(artist.trim().to_string()), track.trim().to_string());
        }
    }
    if let Some((artist, track)) = title.split_once(" | ") {
        return (Some(artist.trim().to_string()), track.trim().to_string());
    }
    (None, title.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn search_parses_and_filters_upstream_results() {
        let router = Router::new()
            .route(
                "/search",
                get(|| async {
                    Json(serde_json::json!({
                        "items": [
                            {
                                "id": {"videoId": "v1"},
                                "snippet": {
                                    "title": "Queen - Bohemian Rhapsody",
                                    "channelTitle": "QueenVEVO",
                                    "thumbnails": {"medium": {"url": "https://i.ytimg.com/v1.jpg"}}
                                }
                            },
                            {
                                "id": {"videoId": "v2"},
                                "snippet": {
                                    "title": "Full Concert 2019",
                                    "channelTitle": "LiveChannel"
                                }
                            }
                        ]
                    }))
                }),
            )
            .route(
                "/videos",
                get(|| async {
                    Json(serde_json::json!({
                        "items": [
                            {"id": "v1", "contentDetails": {"duration": "PT5M55S"}},
                            {"id": "v2", "contentDetails": {"duration": "PT1H30M"}}
                        ]
                    }))
                }),
            );
        let base = serve(router).await;

        let provider = YouTubeProvider::new("key".into()).with_base_url(base);
        let results = provider.search("bohemian").await.unwrap();

        // The 90-minute video is dropped as non-music.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "v1");
        assert_eq!(results[0].artist, "Queen");
        assert_eq!(results[0].title, "Bohemian Rhapsody");
        assert_eq!(results[0].duration, 355);
        assert_eq!(
            results[0].thumbnail.as_deref(),
            Some("https://i.ytimg.com/v1.jpg")
        );
    }

    #[tokio::test]
    async fn upstream_error_status_is_an_error() {
        let router = Router::new().route(
            "/search",
            get(|| async { axum::http::StatusCode::FORBIDDEN }),
        );
        let base = serve(router).await;

        let provider = YouTubeProvider::new("key".into()).with_base_url(base);
        let err = provider.search("anything").await.unwrap_err();
        assert!(matches!(err, ProviderError::UnexpectedResponse(_)));
    }

    #[test]
    fn parses_iso8601_durations() {
        assert_eq!(parse_iso8601_duration("PT3M55S"), 235);
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_iso8601_duration("PT45S"), 45);
        assert_eq!(parse_iso8601_duration("PT2M"), 120);
        assert_eq!(parse_iso8601_duration("PT0S"), 0);
        assert_eq!(parse_iso8601_duration("garbage"), 0);
    }

    #[test]
    fn splits_dash_separated_titles() {
        let (artist, title) = split_video_title("Queen - Bohemian Rhapsody");
        assert_eq!(artist.as_deref(), Some("Queen"));
        assert_eq!(title, "Bohemian Rhapsody");
    }

    #[test]
    fn splits_colon_and_pipe_separated_titles() {
        let (artist, title) = split_video_title("Eagles: Hotel California");
        assert_eq!(artist.as_deref(), Some("Eagles"));
        assert_eq!(title, "Hotel California");

        let (artist, title) = split_video_title("Nirvana | Smells Like Teen Spirit");
        assert_eq!(artist.as_deref(), Some("Nirvana"));
        assert_eq!(title, "Smells Like Teen Spirit");
    }

    #[test]
    fn splits_by_separated_titles_reversed() {
        let (artist, title) = split_video_title("Yesterday by The Beatles");
        assert_eq!(artist.as_deref(), Some("The Beatles"));
        assert_eq!(title, "Yesterday");
    }

    #[test]
    fn unsplittable_title_has_no_artist() {
        let (artist, title) = split_video_title("Bohemian Rhapsody");
        assert!(artist.is_none());
        assert_eq!(title, "Bohemian Rhapsody");
    }

    #[tokio::test]
    async fn is_authenticated_reflects_key_presence() {
        assert!(!YouTubeProvider::new(String::new()).is_authenticated().await);
        assert!(YouTubeProvider::new("key".into()).is_authenticated().await);
    }

    #[tokio::test]
    async fn search_without_key_is_an_error() {
        let provider = YouTubeProvider::new(String::new());
        let err = provider.search("test").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredentials(_)));
    }
}
