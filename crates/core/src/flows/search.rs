use tracing::debug;

use crate::{
    client::SearchApi,
    error::{ClientError, ValidationError},
    types::{SearchQuery, SearchResponse, SearchResult},
};

pub const NO_RESULTS_NOTICE: &str = "No videos matched your search. Try different keywords.";

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchState {
    #[default]
    Idle,
    Searching {
        query: SearchQuery,
    },
    Success {
        query: SearchQuery,
        response: SearchResponse,
    },
    Empty {
        query: SearchQuery,
    },
    Error {
        query: SearchQuery,
        message: String,
    },
}

impl SearchState {
    pub fn query(&self) -> Option<&SearchQuery> {
        match self {
            SearchState::Idle => None,
            SearchState::Searching { query }
            | SearchState::Success { query, .. }
            | SearchState::Empty { query }
            | SearchState::Error { query, .. } => Some(query),
        }
    }
}

/// Drives one search box: validate, issue, then record the outcome.
///
/// Only one search is in flight at a time. Results are kept exactly as the
/// service ranked them.
#[derive(Debug, Default)]
pub struct SearchFlow {
    state: SearchState,
    notice: Option<String>,
}

impl SearchFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Short message for the user about the last submit or completion.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.state, SearchState::Searching { .. })
    }

    pub fn can_submit(&self) -> bool {
        !self.is_searching()
    }

    pub fn results(&self) -> &[SearchResult] {
        match &self.state {
            SearchState::Success { response, .. } => &response.results,
            _ => &[],
        }
    }

    /// Validate input and enter `Searching`.
    ///
    /// Returns the query to send, or `None` when a search is already in
    /// flight. A validation failure leaves the current state as it was.
    pub fn submit(
        &mut self,
        text: &str,
        result_limit: u32,
        collection: Option<&str>,
    ) -> Result<Option<SearchQuery>, ValidationError> {
        if self.is_searching() {
            debug!("search already in flight, ignoring submit");
            return Ok(None);
        }

        let query = SearchQuery::new(text, result_limit, collection).inspect_err(|e| {
            self.notice = Some(e.to_string());
        })?;

        debug!(query = query.text(), top_k = query.result_limit(), "search started");
        self.notice = None;
        self.state = SearchState::Searching {
            query: query.clone(),
        };
        Ok(Some(query))
    }

    /// Record the outcome of the in-flight search. Returns `false` if no
    /// search was in flight.
    pub fn complete(&mut self, outcome: Result<SearchResponse, ClientError>) -> bool {
        let query = match std::mem::take(&mut self.state) {
            SearchState::Searching { query } => query,
            other => {
                self.state = other;
                return false;
            }
        };

        self.state = match outcome {
            Ok(response) if response.results.is_empty() => {
                self.notice = Some(NO_RESULTS_NOTICE.to_string());
                SearchState::Empty { query }
            }
            Ok(response) => {
                debug!(results = response.results.len(), "search succeeded");
                self.notice = None;
                SearchState::Success { query, response }
            }
            Err(err) => {
                debug!(error = %err, "search failed");
                let message = err.user_message();
                self.notice = Some(message.clone());
                SearchState::Error { query, message }
            }
        };
        true
    }

    /// Back to `Idle`, dropping results and notices.
    pub fn clear(&mut self) {
        if self.is_searching() {
            return;
        }
        self.state = SearchState::Idle;
        self.notice = None;
    }

    /// Submit, call the service, and complete in one step.
    pub async fn run(
        &mut self,
        api: &dyn SearchApi,
        text: &str,
        result_limit: u32,
        collection: Option<&str>,
    ) -> Result<&SearchState, ValidationError> {
        if let Some(query) = self.submit(text, result_limit, collection)? {
            let outcome = api.search(&query).await;
            self.complete(outcome);
        }
        Ok(&self.state)
    }
}
