use tracing::debug;

use crate::{
    client::SearchApi,
    error::{Result, ValidationError},
    types::{SummaryRequest, SummaryResult, normalize_collection},
    youtube::extract_video_id,
};

/// Identifies one summary request. Later requests get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SummaryState {
    #[default]
    Closed,
    Loading {
        video_id: String,
    },
    Ready(SummaryResult),
    Failed {
        video_id: String,
        message: String,
    },
}

/// A summary request handed out by [`SummaryFlow::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTicket {
    pub id: RequestId,
    pub request: SummaryRequest,
}

impl SummaryTicket {
    pub async fn send(&self, api: &dyn SearchApi) -> Result<SummaryResult> {
        api.summarize(&self.request).await
    }
}

/// The summary panel. Opening it for another video supersedes the previous
/// request; only the latest request's outcome is ever shown.
#[derive(Debug, Default)]
pub struct SummaryFlow {
    state: SummaryState,
    latest: Option<RequestId>,
    next_id: u64,
}

impl SummaryFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SummaryState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != SummaryState::Closed
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SummaryState::Loading { .. })
    }

    /// Id of the request whose outcome the panel is waiting for.
    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }

    /// Open the panel for a video id or YouTube link and start loading.
    pub fn request(
        &mut self,
        video: &str,
        collection: Option<&str>,
    ) -> std::result::Result<SummaryTicket, ValidationError> {
        let video_id = extract_video_id(video);
        if video_id.is_empty() {
            return Err(ValidationError::EmptyVideoId);
        }

        self.next_id += 1;
        let id = RequestId(self.next_id);
        if let Some(previous) = self.latest.replace(id) {
            debug!(%previous, %id, "summary request superseded");
        }
        debug!(%id, video_id = %video_id, "summary requested");

        self.state = SummaryState::Loading {
            video_id: video_id.clone(),
        };
        Ok(SummaryTicket {
            id,
            request: SummaryRequest {
                video_id,
                collection: normalize_collection(collection),
            },
        })
    }

    /// Apply the outcome of request `id`. Returns `false` and changes nothing
    /// when `id` has been superseded or the panel was closed.
    pub fn resolve(&mut self, id: RequestId, outcome: Result<SummaryResult>) -> bool {
        if self.latest != Some(id) {
            debug!(%id, "dropping stale summary response");
            return false;
        }
        let SummaryState::Loading { video_id } = &self.state else {
            return false;
        };
        let video_id = video_id.clone();

        self.state = match outcome {
            Ok(summary) => SummaryState::Ready(summary),
            Err(err) => {
                debug!(%id, error = %err, "summary failed");
                SummaryState::Failed {
                    video_id,
                    message: err.user_message(),
                }
            }
        };
        true
    }

    /// Close the panel. Responses still in flight are dropped when they land.
    pub fn close(&mut self) {
        self.state = SummaryState::Closed;
        self.latest = None;
    }

    pub async fn run(
        &mut self,
        api: &dyn SearchApi,
        video: &str,
        collection: Option<&str>,
    ) -> std::result::Result<&SummaryState, ValidationError> {
        let ticket = self.request(video, collection)?;
        let outcome = ticket.send(api).await;
        self.resolve(ticket.id, outcome);
        Ok(&self.state)
    }
}
