//! Relevance ranking for merged search results.
//!
//! Scores are additive: title and artist matches dominate, a small bonus
//! favors club-friendly durations, and a per-service bias breaks ties
//! between otherwise equal hits. Sorting is stable, so equal scores keep
//! their provider-reported order.

use std::cmp::Reverse;

use crate::provider::{SearchResult, Service};

const TITLE_EXACT: i32 = 100;
const TITLE_STARTS_WITH: i32 = 80;
const TITLE_CONTAINS: i32 = 60;

const ARTIST_EXACT: i32 = 90;
const ARTIST_STARTS_WITH: i32 = 70;
const ARTIST_CONTAINS: i32 = 50;

const DURATION_BONUS: i32 = 10;
const MAX_BONUS_SECONDS: i64 = 600;

fn service_bias(service: Service) -> i32 {
    match service {
        Service::Spotify => 5,
        Service::Apple => 3,
        Service::Youtube => 1,
    }
}

/// Score one result against an already-lowercased query.
pub fn relevance_score(result: &SearchResult, query_lower: &str) -> i32 {
    let title = result.title.to_lowercase();
    let artist = result.artist.to_lowercase();

    let mut score = 0;

    if title == query_lower {
        score += TITLE_EXACT;
    } else if title.starts_with(query_lower) {
        score += TITLE_STARTS_WITH;
    } else if title.contains(query_lower) {
        score += TITLE_CONTAINS;
    }

    if artist == query_lower {
        score += ARTIST_EXACT;
    } else if artist.starts_with(query_lower) {
        score += ARTIST_STARTS_WITH;
    } else if artist.contains(query_lower) {
        score += ARTIST_CONTAINS;
    }

    if result.duration > 0 && result.duration <= MAX_BONUS_SECONDS {
        score += DURATION_BONUS;
    }

    score += service_bias(result.service);
    score
}

/// Order merged results by descending relevance.
pub fn rank(results: Vec<SearchResult>, query: &str) -> Vec<SearchResult> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<(i32, SearchResult)> = results
        .into_iter()
        .map(|result| (relevance_score(&result, &query_lower), result))
        .collect();
    scored.sort_by_key(|(score, _)| Reverse(*score));
    scored.into_iter().map(|(_, result)| result).collect()
}
