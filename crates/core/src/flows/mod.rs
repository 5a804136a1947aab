pub mod search;
pub mod summary;
pub mod upload;

pub use search::*;
pub use summary::*;
pub use upload::*;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::{
        client::SearchApi,
        error::{ClientError, Result},
        types::{
            CsvFile, HealthStatus, IngestSummary, SearchQuery, SearchResponse, SearchResult,
            SummaryRequest, SummaryResult, VideoDetail,
        },
    };

    /// Canned answers plus a log of every call made.
    pub(crate) struct FakeApi {
        pub search: Result<SearchResponse>,
        pub ingest: Result<IngestSummary>,
        pub summary_error: Option<ClientError>,
        pub calls: Mutex<Vec<String>>,
    }

    impl Default for FakeApi {
        fn default() -> Self {
            Self {
                search: Ok(SearchResponse::default()),
                ingest: Ok(IngestSummary::default()),
                summary_error: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeApi {
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    pub(crate) fn result(id: &str, score: f64) -> SearchResult {
        SearchResult {
            video_id: id.to_string(),
            title: format!("Video {id}"),
            channel_title: None,
            view_count: None,
            like_count: None,
            duration_seconds: None,
            thumbnail_url: None,
            transcript_snippet: None,
            relevance_score: score,
            relevance_label: None,
        }
    }

    pub(crate) fn summary(id: &str) -> SummaryResult {
        SummaryResult {
            video_id: id.to_string(),
            title: format!("Video {id}"),
            channel_title: None,
            view_count: None,
            duration_seconds: None,
            statistics: None,
            summary_text: format!("Summary of {id}"),
            generated_at: Utc::now(),
        }
    }

    #[async_trait]
    impl SearchApi for FakeApi {
        async fn upload_csv(&self, file: &CsvFile) -> Result<IngestSummary> {
            self.record(format!("upload:{}", file.filename));
            self.ingest.clone()
        }

        async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
            self.record(format!("search:{}", query.text()));
            self.search.clone()
        }

        async fn fetch_video(
            &self,
            video_id: &str,
            _collection: Option<&str>,
        ) -> Result<VideoDetail> {
            self.record(format!("video:{video_id}"));
            Err(ClientError::Api {
                status: 404,
                detail: Some("Video not found".to_string()),
            })
        }

        async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResult> {
            self.record(format!("summarize:{}", request.video_id));
            match &self.summary_error {
                Some(err) => Err(err.clone()),
                None => Ok(summary(&request.video_id)),
            }
        }

        async fn health(&self) -> Result<HealthStatus> {
            self.record("health".to_string());
            Err(ClientError::network("connection refused"))
        }

        async fn create_collection(&self, name: &str, file: &CsvFile) -> Result<IngestSummary> {
            self.record(format!("create:{name}:{}", file.filename));
            self.ingest.clone()
        }

        async fn delete_collection(&self, name: &str) -> Result<String> {
            self.record(format!("delete:{name}"));
            Ok(format!("Collection '{name}' deleted"))
        }
    }
}
