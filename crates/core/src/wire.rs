//! Decoding of the search service's JSON.
//!
//! The backends this client talks to disagree on field names and value
//! shapes, so every payload is read into a lenient wire struct first and
//! then converted into the crate's domain types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::{
    error::ClientError,
    types::{
        CollectionInfo, HealthStatus, IngestSummary, SearchResponse, SearchResult, SummaryResult,
        TranscriptStatistics, VideoDetail,
    },
};

#[derive(Debug, Deserialize)]
pub(crate) struct WireSearchResult {
    #[serde(alias = "id")]
    video_id: String,
    #[serde(default, deserialize_with = "opt_text")]
    title: Option<String>,
    #[serde(default, alias = "channel", deserialize_with = "opt_text")]
    channel_title: Option<String>,
    #[serde(
        default,
        alias = "views",
        alias = "viewCount",
        deserialize_with = "opt_count"
    )]
    view_count: Option<u64>,
    #[serde(default, alias = "likes", deserialize_with = "opt_count")]
    like_count: Option<u64>,
    #[serde(default, alias = "duration", deserialize_with = "opt_seconds")]
    duration_seconds: Option<u64>,
    #[serde(default, alias = "thumbnail", deserialize_with = "opt_text")]
    thumbnail_url: Option<String>,
    #[serde(
        default,
        alias = "preview",
        alias = "snippet",
        deserialize_with = "opt_text"
    )]
    transcript_snippet: Option<String>,
    #[serde(alias = "similarity_score", alias = "similarity", alias = "score")]
    relevance_score: f64,
    #[serde(default, alias = "relevance", deserialize_with = "opt_text")]
    relevance_label: Option<String>,
}

impl WireSearchResult {
    fn into_domain(self) -> Result<SearchResult, ClientError> {
        if !self.relevance_score.is_finite() {
            return Err(ClientError::unexpected(format!(
                "non-finite relevance score for video {}",
                self.video_id
            )));
        }

        Ok(SearchResult {
            title: self.title.unwrap_or_default(),
            video_id: self.video_id,
            channel_title: self.channel_title,
            view_count: self.view_count,
            like_count: self.like_count,
            duration_seconds: self.duration_seconds,
            thumbnail_url: self.thumbnail_url,
            transcript_snippet: self.transcript_snippet,
            relevance_score: self.relevance_score,
            relevance_label: self.relevance_label,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireSearchResponse {
    Wrapped {
        results: Vec<WireSearchResult>,
        #[serde(default)]
        total_results: Option<u64>,
        #[serde(default)]
        average_similarity: Option<f64>,
        #[serde(default)]
        max_similarity: Option<f64>,
        #[serde(default)]
        search_type: Option<String>,
    },
    Bare(Vec<WireSearchResult>),
}

impl WireSearchResponse {
    pub(crate) fn into_domain(self) -> Result<SearchResponse, ClientError> {
        let (results, mut response) = match self {
            WireSearchResponse::Wrapped {
                results,
                total_results,
                average_similarity,
                max_similarity,
                search_type,
            } => (
                results,
                SearchResponse {
                    total_results,
                    average_similarity,
                    max_similarity,
                    search_type,
                    ..Default::default()
                },
            ),
            WireSearchResponse::Bare(results) => (results, SearchResponse::default()),
        };

        response.results = results
            .into_iter()
            .map(WireSearchResult::into_domain)
            .collect::<Result<_, _>>()?;
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIngestSummary {
    #[serde(default)]
    status: Option<String>,
    #[serde(
        default,
        alias = "rows_added",
        alias = "rows_inserted",
        alias = "inserted_records",
        deserialize_with = "opt_count"
    )]
    ingested_count: Option<u64>,
    #[serde(default, deserialize_with = "opt_count")]
    error_count: Option<u64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default, deserialize_with = "opt_count")]
    total_chunks: Option<u64>,
}

impl WireIngestSummary {
    pub(crate) fn into_domain(self) -> IngestSummary {
        IngestSummary {
            status: self.status,
            ingested_count: self.ingested_count,
            error_count: self.error_count,
            message: self.message.unwrap_or_default(),
            timestamp: self.timestamp,
            total_chunks: self.total_chunks,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireVideoDetail {
    #[serde(default, alias = "id")]
    video_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    title: Option<String>,
    #[serde(default, alias = "channel", deserialize_with = "opt_text")]
    channel_title: Option<String>,
    #[serde(
        default,
        alias = "views",
        alias = "viewCount",
        deserialize_with = "opt_count"
    )]
    view_count: Option<u64>,
    #[serde(default, alias = "likes", deserialize_with = "opt_count")]
    like_count: Option<u64>,
    #[serde(default, alias = "duration", deserialize_with = "opt_seconds")]
    duration_seconds: Option<u64>,
    #[serde(default, alias = "thumbnail", deserialize_with = "opt_text")]
    thumbnail_url: Option<String>,
    #[serde(default, alias = "youtube_url", deserialize_with = "opt_text")]
    watch_url: Option<String>,
    #[serde(default, alias = "document", deserialize_with = "opt_text")]
    transcript: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl WireVideoDetail {
    /// `requested_id` fills in for backends that do not echo the id.
    pub(crate) fn into_domain(self, requested_id: &str) -> VideoDetail {
        let mut metadata = self.rest;
        if let Some(Value::Object(nested)) = metadata.remove("metadata") {
            for (key, value) in nested {
                metadata.entry(key).or_insert(value);
            }
        }

        VideoDetail {
            video_id: self.video_id.unwrap_or_else(|| requested_id.to_string()),
            title: self.title.unwrap_or_default(),
            channel_title: self.channel_title,
            view_count: self.view_count,
            like_count: self.like_count,
            duration_seconds: self.duration_seconds,
            thumbnail_url: self.thumbnail_url,
            watch_url: self.watch_url,
            transcript: self.transcript,
            metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireStatistics {
    #[serde(default, deserialize_with = "opt_count")]
    transcript_length: Option<u64>,
    #[serde(default, deserialize_with = "opt_count")]
    word_count: Option<u64>,
    #[serde(default, deserialize_with = "opt_count")]
    sentence_count: Option<u64>,
    #[serde(default)]
    avg_word_length: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSummaryText {
    Text(String),
    Points(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSummary {
    #[serde(default, alias = "id")]
    video_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    title: Option<String>,
    #[serde(default, alias = "channel", deserialize_with = "opt_text")]
    channel_title: Option<String>,
    #[serde(
        default,
        alias = "views",
        alias = "viewCount",
        deserialize_with = "opt_count"
    )]
    view_count: Option<u64>,
    #[serde(default, alias = "duration", deserialize_with = "opt_seconds")]
    duration_seconds: Option<u64>,
    #[serde(default)]
    statistics: Option<WireStatistics>,
    #[serde(alias = "summary", alias = "summary_points")]
    summary_text: WireSummaryText,
    #[serde(default, deserialize_with = "opt_timestamp")]
    generated_at: Option<DateTime<Utc>>,
}

impl WireSummary {
    pub(crate) fn into_domain(
        self,
        requested_id: &str,
        received_at: DateTime<Utc>,
    ) -> SummaryResult {
        let summary_text = match self.summary_text {
            WireSummaryText::Text(text) => text.trim().to_string(),
            WireSummaryText::Points(points) => points
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        };

        let statistics = self.statistics.and_then(|s| {
            // A statistics object with none of the expected keys carries nothing.
            if s.transcript_length.is_none() && s.word_count.is_none() {
                return None;
            }
            Some(TranscriptStatistics {
                transcript_length: s.transcript_length.unwrap_or(0),
                word_count: s.word_count.unwrap_or(0),
                sentence_count: s.sentence_count.unwrap_or(0),
                avg_word_length: s.avg_word_length.filter(|v| v.is_finite()).unwrap_or(0.0),
            })
        });

        SummaryResult {
            video_id: self.video_id.unwrap_or_else(|| requested_id.to_string()),
            title: self.title.unwrap_or_default(),
            channel_title: self.channel_title,
            view_count: self.view_count,
            duration_seconds: self.duration_seconds,
            statistics,
            summary_text,
            generated_at: self.generated_at.unwrap_or(received_at),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireCollection {
    Name(String),
    Detailed {
        #[serde(alias = "collection_name")]
        name: String,
        #[serde(default, alias = "count", deserialize_with = "opt_count")]
        record_count: Option<u64>,
    },
}

impl From<WireCollection> for CollectionInfo {
    fn from(value: WireCollection) -> Self {
        match value {
            WireCollection::Name(name) => CollectionInfo {
                name,
                record_count: None,
            },
            WireCollection::Detailed { name, record_count } => {
                CollectionInfo { name, record_count }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireHealth {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "opt_count")]
    total_videos: Option<u64>,
    #[serde(default)]
    search_engine_ready: Option<bool>,
    #[serde(default, alias = "version")]
    api_version: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default, alias = "collections")]
    databases: Option<Vec<WireCollection>>,
}

impl WireHealth {
    pub(crate) fn into_domain(self) -> HealthStatus {
        HealthStatus {
            status: self.status.unwrap_or_else(|| "unknown".to_string()),
            total_videos: self.total_videos.unwrap_or(0),
            search_engine_ready: self.search_engine_ready.unwrap_or(false),
            api_version: self.api_version,
            timestamp: self.timestamp,
            databases: self
                .databases
                .unwrap_or_default()
                .into_iter()
                .map(CollectionInfo::from)
                .collect(),
        }
    }
}

/// Pull a human message out of a loosely shaped acknowledgement body.
pub(crate) fn acknowledgement_message(value: &Value) -> Option<String> {
    ["message", "detail", "status"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(parse_text))
}

fn opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(parse_count))
}

fn opt_seconds<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(parse_seconds))
}

fn opt_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

fn is_placeholder(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("n/a") || s.eq_ignore_ascii_case("nan")
}

/// Text fields: empty strings and "N/A" count as absent; numbers are kept as text.
pub fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if is_placeholder(s) { None } else { Some(s.to_string()) }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Counts arrive as numbers, numeric strings ("12,345", "10+") or already
/// abbreviated strings ("1.2K", "3.4M").
pub fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Some(v);
            }
            n.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)
        }
        Value::String(s) => parse_count_str(s),
        Value::Object(map) => ["viewCount", "views", "view_count"]
            .iter()
            .find_map(|key| map.get(*key).and_then(parse_count)),
        _ => None,
    }
}

fn parse_count_str(s: &str) -> Option<u64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '+' && *c != '_' && !c.is_whitespace())
        .collect();
    if is_placeholder(&cleaned) {
        return None;
    }

    let (number, multiplier) = match cleaned.chars().last()? {
        'k' | 'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'm' | 'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        'b' | 'B' => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    let parsed: f64 = number.parse().ok()?;
    let value = parsed * multiplier;
    if value.is_finite() && value >= 0.0 {
        Some(value.round() as u64)
    } else {
        None
    }
}

/// Durations arrive as seconds, "M:SS" / "H:MM:SS", or ISO-8601 ("PT1H2M5S").
pub fn parse_seconds(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)),
        Value::String(s) => parse_seconds_str(s.trim()),
        _ => None,
    }
}

fn parse_seconds_str(s: &str) -> Option<u64> {
    if is_placeholder(s) {
        return None;
    }
    if let Ok(v) = s.parse::<f64>() {
        return (v.is_finite() && v >= 0.0).then_some(v as u64);
    }
    if s.contains(':') {
        return parse_clock(s);
    }
    if s.starts_with(['P', 'p']) {
        return parse_iso8601_duration(s);
    }
    None
}

fn parse_clock(s: &str) -> Option<u64> {
    let parts: Vec<u64> = s
        .split(':')
        .map(|p| p.trim().parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    parts
        .iter()
        .try_fold(0_u64, |acc, part| acc.checked_mul(60)?.checked_add(*part))
}

fn parse_iso8601_duration(s: &str) -> Option<u64> {
    let mut total = 0.0_f64;
    let mut number = String::new();
    let mut in_time = false;
    let mut seen_unit = false;

    for c in s[1..].chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'T' | 't' => in_time = true,
            unit => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                let factor = match (unit.to_ascii_uppercase(), in_time) {
                    ('W', false) => 7.0 * 86_400.0,
                    ('D', false) => 86_400.0,
                    ('H', true) => 3_600.0,
                    ('M', true) => 60.0,
                    ('S', true) => 1.0,
                    _ => return None,
                };
                total += value * factor;
                seen_unit = true;
            }
        }
    }

    if !number.is_empty() || !seen_unit || !total.is_finite() || total >= u64::MAX as f64 {
        return None;
    }
    Some(total as u64)
}

/// RFC 3339, or a naive ISO timestamp (Python's `isoformat()`) read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
