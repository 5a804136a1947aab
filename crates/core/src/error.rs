use serde_json::Value;
use thiserror::Error;

use crate::types::MAX_RESULT_LIMIT;

/// Rejected locally by a flow controller; never reaches the API client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a search query")]
    EmptyQuery,

    #[error("Result limit must be between 1 and {}, got {limit}", MAX_RESULT_LIMIT)]
    ResultLimitOutOfRange { limit: u32 },

    #[error("Only CSV files can be uploaded: {filename}")]
    NotCsv { filename: String },

    #[error("Select a CSV file before uploading")]
    NoFileSelected,

    #[error("Please enter a video ID")]
    EmptyVideoId,

    #[error("Collection name cannot be empty")]
    EmptyCollectionName,
}

/// Failure of a call against the search service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("No response from server: {reason}")]
    Network { reason: String },

    #[error("API request failed with status {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Api { status: u16, detail: Option<String> },

    #[error("Unexpected response: {reason}")]
    Unexpected { reason: String },
}

pub const NETWORK_FAILURE_MESSAGE: &str =
    "Could not reach the search service. Check that it is running and try again.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

impl ClientError {
    pub fn network(reason: impl Into<String>) -> Self {
        ClientError::Network {
            reason: reason.into(),
        }
    }

    pub fn unexpected(reason: impl Into<String>) -> Self {
        ClientError::Unexpected {
            reason: reason.into(),
        }
    }

    /// Map a transport failure from reqwest.
    ///
    /// Anything that kept a full response from arriving counts as a network
    /// failure; builder and redirect problems are unexpected.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() || err.is_redirect() {
            return ClientError::unexpected(err.to_string());
        }
        ClientError::network(err.to_string())
    }

    /// Build an `Api` error from a non-2xx status and its raw body.
    pub(crate) fn from_status(status: u16, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|value| value.get("detail").and_then(coerce_detail));
        ClientError::Api { status, detail }
    }

    /// Text fit for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ClientError::Network { .. } => NETWORK_FAILURE_MESSAGE.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network { .. })
    }
}

/// Errors surfaced by a flow controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl FlowError {
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Validation(e) => e.to_string(),
            FlowError::Client(e) => e.user_message(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid API base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Reduce a `detail` value of any shape to one message.
///
/// FastAPI validation errors arrive as arrays of `{loc, msg, type}`; hand
/// written handlers send plain strings or nested objects.
pub fn coerce_detail(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(coerce_detail_item)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => ["msg", "message", "detail"]
            .iter()
            .find_map(|key| map.get(*key).and_then(coerce_detail))
            .unwrap_or_default(),
    };

    if text.is_empty() { None } else { Some(text) }
}

fn coerce_detail_item(item: &Value) -> Option<String> {
    let Value::Object(map) = item else {
        return coerce_detail(item);
    };

    let msg = coerce_detail(item)?;
    let loc = map.get("loc").and_then(Value::as_array).map(|parts| {
        parts
            .iter()
            .map(|p| match p {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    });

    match loc {
        Some(loc) if !loc.is_empty() => Some(format!("{loc}: {msg}")),
        _ => Some(msg),
    }
}
