//! Display model for search results.

use serde::Serialize;

use crate::{
    format::{format_count, format_duration, format_score, truncate_chars},
    types::SearchResult,
    youtube::{ThumbnailQuality, thumbnail_url, watch_url},
};

pub const UNTITLED: &str = "Untitled video";
pub const UNKNOWN_CHANNEL: &str = "Unknown channel";
const SNIPPET_CHARS: usize = 200;

/// Thumbnail source with at most one fallback.
///
/// An explicit URL from the service has no fallback. A URL derived from the
/// video id falls back once to the low resolution variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thumbnail {
    current: String,
    fallback: Option<String>,
}

impl Thumbnail {
    pub fn for_result(explicit: Option<&str>, video_id: &str) -> Self {
        match explicit {
            Some(url) => Self {
                current: url.to_string(),
                fallback: None,
            },
            None => Self {
                current: thumbnail_url(video_id, ThumbnailQuality::Medium),
                fallback: Some(thumbnail_url(video_id, ThumbnailQuality::Default)),
            },
        }
    }

    pub fn url(&self) -> &str {
        &self.current
    }

    /// Switch to the fallback after a failed load. Returns the new URL, or
    /// `None` once the fallback has been used (or there never was one).
    pub fn on_load_error(&mut self) -> Option<&str> {
        let next = self.fallback.take()?;
        self.current = next;
        Some(&self.current)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoCard {
    /// 1-based position in the service's ranking.
    pub rank: usize,
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub views: String,
    pub likes: String,
    pub duration: String,
    pub thumbnail: Thumbnail,
    pub watch_url: String,
    pub score: f64,
    pub score_label: String,
    pub relevance: Option<String>,
    pub snippet: Option<String>,
}

impl VideoCard {
    pub fn from_result(rank: usize, result: &SearchResult) -> Self {
        let title = if result.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            result.title.trim().to_string()
        };

        Self {
            rank,
            video_id: result.video_id.clone(),
            title,
            channel: result
                .channel_title
                .clone()
                .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string()),
            views: format_count(result.view_count),
            likes: format_count(result.like_count),
            duration: format_duration(result.duration_seconds),
            thumbnail: Thumbnail::for_result(result.thumbnail_url.as_deref(), &result.video_id),
            watch_url: watch_url(&result.video_id),
            score: result.relevance_score,
            score_label: format_score(result.relevance_score),
            relevance: result.relevance_label.clone(),
            snippet: result
                .transcript_snippet
                .as_deref()
                .map(|s| truncate_chars(s, SNIPPET_CHARS)),
        }
    }
}

/// Map results to cards, keeping the service's order.
pub fn to_cards(results: &[SearchResult]) -> Vec<VideoCard> {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| VideoCard::from_result(i + 1, r))
        .collect()
}
