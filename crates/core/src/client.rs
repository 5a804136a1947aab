//! HTTP access to the search service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Url, multipart};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::{ClientConfig, SearchMethod},
    error::{ClientError, ConfigError, Result},
    types::{
        CsvFile, HealthStatus, IngestSummary, SearchQuery, SearchResponse, SummaryRequest,
        SummaryResult, VideoDetail,
    },
    wire::{
        WireHealth, WireIngestSummary, WireSearchResponse, WireSummary, WireVideoDetail,
        acknowledgement_message,
    },
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const CSV_MIME: &str = "text/csv";

/// Operations offered by the search service.
///
/// Flow controllers only see this trait, so tests can swap in a fake.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn upload_csv(&self, file: &CsvFile) -> Result<IngestSummary>;

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;

    /// Stored details for one video. With a collection the lookup is scoped
    /// to that collection's metadata.
    async fn fetch_video(&self, video_id: &str, collection: Option<&str>) -> Result<VideoDetail>;

    async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResult>;

    async fn health(&self) -> Result<HealthStatus>;

    /// Ingest a CSV into a new named collection.
    async fn create_collection(&self, name: &str, file: &CsvFile) -> Result<IngestSummary>;

    /// Drop a named collection. Returns the service's acknowledgement text.
    async fn delete_collection(&self, name: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Upload,
    Search,
    FetchVideo,
    Summarize,
    Health,
    CreateCollection,
    DeleteCollection,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::Upload => "upload_csv",
            Operation::Search => "search",
            Operation::FetchVideo => "fetch_video",
            Operation::Summarize => "summarize",
            Operation::Health => "health",
            Operation::CreateCollection => "create_collection",
            Operation::DeleteCollection => "delete_collection",
        }
    }

    /// Uploads and summaries run server-side work and get the long timeout.
    fn is_long_running(self) -> bool {
        matches!(
            self,
            Operation::Upload | Operation::Summarize | Operation::CreateCollection
        )
    }
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection_name: Option<&'a str>,
}

#[derive(Serialize)]
struct SummarizeBody<'a> {
    video_id: &'a str,
    collection_name: &'a str,
}

/// [`SearchApi`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    base_url: Url,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let base_url = config.base_url()?;
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("vidseek/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Invalid {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, keeping any path prefix.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        // The base URL was checked to be http(s), so it always has a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn upload_endpoint(&self) -> Url {
        let segments: Vec<&str> = self
            .config
            .upload_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        self.endpoint(&segments)
    }

    fn timeout(&self, op: Operation) -> Duration {
        if op.is_long_running() {
            self.config.long_timeout()
        } else {
            self.config.short_timeout()
        }
    }

    /// Send a request and return its JSON body.
    ///
    /// An empty 2xx body comes back as `Value::Null`.
    async fn send(&self, op: Operation, request: RequestBuilder) -> Result<Value> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        debug!(%request_id, operation = op.name(), "sending request");

        let response = request
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .timeout(self.timeout(op))
            .send()
            .await
            .map_err(|e| {
                warn!(%request_id, operation = op.name(), error = %e, "request failed");
                ClientError::from_transport(e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            warn!(%request_id, operation = op.name(), error = %e, "failed to read body");
            ClientError::network(e.to_string())
        })?;

        debug!(
            %request_id,
            operation = op.name(),
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response received"
        );

        if !status.is_success() {
            let err = ClientError::from_status(status.as_u16(), &body);
            warn!(%request_id, operation = op.name(), error = %err, "service returned an error");
            return Err(err);
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            ClientError::unexpected(format!("{} returned invalid JSON: {e}", op.name()))
        })?;

        if let Some(message) = embedded_error(&value) {
            warn!(%request_id, operation = op.name(), %message, "service reported an error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                detail: Some(message),
            });
        }

        Ok(value)
    }

    fn csv_form(file: &CsvFile) -> Result<multipart::Form> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(file.content_type.as_deref().unwrap_or(CSV_MIME))
            .map_err(|e| ClientError::unexpected(format!("invalid content type: {e}")))?;
        Ok(multipart::Form::new().part("file", part))
    }
}

/// Some backends answer 200 with `{"error": "..."}` instead of a status code.
fn embedded_error(value: &Value) -> Option<String> {
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn decode<T: DeserializeOwned>(op: Operation, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ClientError::unexpected(format!("malformed {} response: {e}", op.name())))
}

#[async_trait]
impl SearchApi for HttpClient {
    async fn upload_csv(&self, file: &CsvFile) -> Result<IngestSummary> {
        let op = Operation::Upload;
        let request = self
            .http
            .post(self.upload_endpoint())
            .multipart(Self::csv_form(file)?);

        let value = self.send(op, request).await?;
        let wire: WireIngestSummary = decode(op, value)?;
        Ok(wire.into_domain())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let op = Operation::Search;
        let url = self.endpoint(&["search"]);
        let request = match self.config.search_method {
            SearchMethod::Get => {
                let mut params = vec![
                    ("query", query.text().to_string()),
                    ("top_k", query.result_limit().to_string()),
                ];
                if let Some(collection) = query.collection() {
                    params.push(("collection_name", collection.to_string()));
                }
                self.http.get(url).query(&params)
            }
            SearchMethod::Post => self.http.post(url).json(&SearchBody {
                query: query.text(),
                top_k: query.result_limit(),
                collection_name: query.collection(),
            }),
        };

        let value = self.send(op, request).await?;
        let wire: WireSearchResponse = decode(op, value)?;
        wire.into_domain()
    }

    async fn fetch_video(&self, video_id: &str, collection: Option<&str>) -> Result<VideoDetail> {
        let op = Operation::FetchVideo;
        let request = match collection {
            Some(collection) => self
                .http
                .get(self.endpoint(&["video_metadata"]))
                .query(&[("collection_name", collection), ("video_id", video_id)]),
            None => self.http.get(self.endpoint(&["videos", video_id])),
        };

        let value = self.send(op, request).await?;
        let wire: WireVideoDetail = decode(op, value)?;
        Ok(wire.into_domain(video_id))
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResult> {
        let op = Operation::Summarize;
        let http_request = match request.collection.as_deref() {
            Some(collection) => self
                .http
                .post(self.endpoint(&["summarize"]))
                .json(&SummarizeBody {
                    video_id: &request.video_id,
                    collection_name: collection,
                }),
            None => self
                .http
                .get(self.endpoint(&["summarize", &request.video_id])),
        };

        let value = self.send(op, http_request).await?;
        let received_at = Utc::now();
        let wire: WireSummary = decode(op, value)?;
        Ok(wire.into_domain(&request.video_id, received_at))
    }

    async fn health(&self) -> Result<HealthStatus> {
        let op = Operation::Health;
        let value = self.send(op, self.http.get(self.endpoint(&["health"]))).await?;
        let wire: WireHealth = decode(op, value)?;
        Ok(wire.into_domain())
    }

    async fn create_collection(&self, name: &str, file: &CsvFile) -> Result<IngestSummary> {
        let op = Operation::CreateCollection;
        let request = self
            .http
            .post(self.endpoint(&["create_db"]))
            .query(&[("collection_name", name)])
            .multipart(Self::csv_form(file)?);

        let value = self.send(op, request).await?;
        let wire: WireIngestSummary = decode(op, value)?;
        Ok(wire.into_domain())
    }

    async fn delete_collection(&self, name: &str) -> Result<String> {
        let op = Operation::DeleteCollection;
        let request = self
            .http
            .delete(self.endpoint(&["delete_db"]))
            .query(&[("collection_name", name)]);

        let value = self.send(op, request).await?;
        Ok(acknowledgement_message(&value)
            .unwrap_or_else(|| format!("Collection '{name}' deleted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> HttpClient {
        HttpClient::new(ClientConfig::default().with_base_url(base).unwrap()).unwrap()
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        let client = client("http://search.internal:8000/api/");
        assert_eq!(
            client.endpoint(&["search"]).as_str(),
            "http://search.internal:8000/api/search"
        );

        let client = self::client("http://127.0.0.1:8000");
        assert_eq!(
            client.endpoint(&["videos", "abc123"]).as_str(),
            "http://127.0.0.1:8000/videos/abc123"
        );
    }

    #[test]
    fn endpoint_encodes_segments() {
        let client = client("http://127.0.0.1:8000");
        assert_eq!(
            client.endpoint(&["videos", "a b/c"]).as_str(),
            "http://127.0.0.1:8000/videos/a%20b%2Fc"
        );
    }

    #[test]
    fn upload_endpoint_follows_config() {
        let mut config = ClientConfig::default();
        config.upload_path = "/upload_csv/".to_string();
        let client = HttpClient::new(config).unwrap();
        assert_eq!(
            client.upload_endpoint().as_str(),
            "http://127.0.0.1:8000/upload_csv"
        );
    }

    #[test]
    fn long_running_operations() {
        assert!(Operation::Upload.is_long_running());
        assert!(Operation::Summarize.is_long_running());
        assert!(Operation::CreateCollection.is_long_running());
        assert!(!Operation::Search.is_long_running());
        assert!(!Operation::Health.is_long_running());
    }

    #[test]
    fn embedded_error_needs_text() {
        assert_eq!(
            embedded_error(&json!({"error": "Video not found"})),
            Some("Video not found".to_string())
        );
        assert_eq!(embedded_error(&json!({"error": null, "summary": "ok"})), None);
        assert_eq!(embedded_error(&json!({"error_count": 2})), None);
        assert_eq!(embedded_error(&json!([1, 2])), None);
    }
}
