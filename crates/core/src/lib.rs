//! Vidseek Core Library
//!
//! Client for a semantic video search service: CSV ingestion, search,
//! per-video AI summaries, and the display model for search results.

pub mod client;
pub mod config;
pub mod error;
pub mod flows;
pub mod format;
pub mod present;
pub mod types;
pub mod wire;
pub mod youtube;

// Re-export commonly used items at crate root
pub use client::{HttpClient, SearchApi};
pub use crate::config::{ClientConfig, SearchMethod};
pub use error::{ClientError, ConfigError, FlowError, Result, ValidationError};
pub use flows::{
    RequestId, SearchFlow, SearchState, SummaryFlow, SummaryState, SummaryTicket, UploadFlow,
    UploadStatus, UploadTicket,
};
pub use format::{
    format_count, format_duration, format_health_readable, format_ingest_readable, format_score,
    format_summary_readable, format_video_readable,
};
pub use present::{Thumbnail, VideoCard, to_cards};
pub use types::{
    CollectionInfo, CsvFile, HealthStatus, IngestSummary, SearchQuery, SearchResponse,
    SearchResult, SummaryRequest, SummaryResult, VideoDetail,
};
pub use youtube::{extract_video_id, watch_url};
