use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::ValidationError;

pub const DEFAULT_RESULT_LIMIT: u32 = 5;
pub const MIN_RESULT_LIMIT: u32 = 1;
pub const MAX_RESULT_LIMIT: u32 = 20;

/// A validated search request. Only constructible through [`SearchQuery::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    text: String,
    result_limit: u32,
    collection: Option<String>,
}

impl SearchQuery {
    pub fn new(
        text: &str,
        result_limit: u32,
        collection: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if !(MIN_RESULT_LIMIT..=MAX_RESULT_LIMIT).contains(&result_limit) {
            return Err(ValidationError::ResultLimitOutOfRange {
                limit: result_limit,
            });
        }

        Ok(Self {
            text: text.to_string(),
            result_limit,
            collection: normalize_collection(collection),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn result_limit(&self) -> u32 {
        self.result_limit
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }
}

/// Blank collection names mean "the default collection".
pub(crate) fn normalize_collection(collection: Option<&str>) -> Option<String> {
    collection
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub video_id: String,
    pub title: String,
    pub channel_title: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub duration_seconds: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub transcript_snippet: Option<String>,
    /// Opaque ranking value from the service. Always finite.
    pub relevance_score: f64,
    pub relevance_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Rank order as returned by the service.
    pub results: Vec<SearchResult>,
    pub total_results: Option<u64>,
    pub average_similarity: Option<f64>,
    pub max_similarity: Option<f64>,
    pub search_type: Option<String>,
}

/// A file picked for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl CsvFile {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = guess_content_type(&filename).map(str::to_string);

        Ok(Self {
            filename,
            content_type,
            bytes,
        })
    }

    /// Whether the name or MIME type marks this as CSV.
    pub fn looks_like_csv(&self) -> bool {
        let by_name = has_csv_extension(&self.filename);
        let by_type = self
            .content_type
            .as_deref()
            .map(|ct| {
                let essence = ct.split(';').next().unwrap_or("").trim();
                essence.eq_ignore_ascii_case("text/csv")
                    || essence.eq_ignore_ascii_case("application/csv")
            })
            .unwrap_or(false);
        by_name || by_type
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn has_csv_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn guess_content_type(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "csv" => Some("text/csv"),
        "tsv" => Some("text/tab-separated-values"),
        "txt" => Some("text/plain"),
        "json" => Some("application/json"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        _ => None,
    }
}

/// Outcome of a CSV ingestion, reported verbatim. A count the service did
/// not report stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub status: Option<String>,
    pub ingested_count: Option<u64>,
    pub error_count: Option<u64>,
    pub message: String,
    pub timestamp: Option<String>,
    pub total_chunks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetail {
    pub video_id: String,
    pub title: String,
    pub channel_title: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub duration_seconds: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub watch_url: Option<String>,
    pub transcript: Option<String>,
    /// Fields the service sent that have no dedicated slot.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRequest {
    pub video_id: String,
    pub collection: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TranscriptStatistics {
    pub transcript_length: u64,
    pub word_count: u64,
    pub sentence_count: u64,
    pub avg_word_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub video_id: String,
    pub title: String,
    pub channel_title: Option<String>,
    pub view_count: Option<u64>,
    pub duration_seconds: Option<u64>,
    pub statistics: Option<TranscriptStatistics>,
    pub summary_text: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub record_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub total_videos: u64,
    pub search_engine_ready: bool,
    pub api_version: Option<String>,
    pub timestamp: Option<String>,
    pub databases: Vec<CollectionInfo>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "healthy" | "ok" | "running" | "ready"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_trimmed() {
        let q = SearchQuery::new("  machine learning \n", 5, None).unwrap();
        assert_eq!(q.text(), "machine learning");
        assert_eq!(q.result_limit(), 5);
        assert_eq!(q.collection(), None);
    }

    #[test]
    fn whitespace_query_is_rejected() {
        assert_eq!(
            SearchQuery::new(" \t ", 5, None),
            Err(ValidationError::EmptyQuery)
        );
    }

    #[test]
    fn limit_bounds_are_enforced() {
        assert!(SearchQuery::new("q", 1, None).is_ok());
        assert!(SearchQuery::new("q", 20, None).is_ok());
        assert_eq!(
            SearchQuery::new("q", 0, None),
            Err(ValidationError::ResultLimitOutOfRange { limit: 0 })
        );
        assert_eq!(
            SearchQuery::new("q", 21, None),
            Err(ValidationError::ResultLimitOutOfRange { limit: 21 })
        );
    }

    #[test]
    fn blank_collection_is_dropped() {
        let q = SearchQuery::new("q", 5, Some("  ")).unwrap();
        assert_eq!(q.collection(), None);
        let q = SearchQuery::new("q", 5, Some(" lectures ")).unwrap();
        assert_eq!(q.collection(), Some("lectures"));
    }

    #[test]
    fn csv_detection_by_name_or_type() {
        assert!(CsvFile::new("videos.CSV", None, vec![]).looks_like_csv());
        assert!(
            CsvFile::new("export", Some("text/csv; charset=utf-8".into()), vec![]).looks_like_csv()
        );
        assert!(!CsvFile::new("videos.xlsx", None, vec![]).looks_like_csv());
        assert!(!CsvFile::new("csv", Some("application/pdf".into()), vec![]).looks_like_csv());
    }

    #[tokio::test]
    async fn from_path_reads_bytes_and_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos.csv");
        std::fs::write(&path, "video_id,transcript\nabc,hello\n").unwrap();

        let file = CsvFile::from_path(&path).await.unwrap();
        assert_eq!(file.filename, "videos.csv");
        assert_eq!(file.content_type.as_deref(), Some("text/csv"));
        assert_eq!(file.size(), 30);
    }
}
