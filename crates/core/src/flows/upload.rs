use tracing::debug;

use crate::{
    client::SearchApi,
    error::{Result, ValidationError},
    types::{CsvFile, IngestSummary, normalize_collection},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Succeeded(IngestSummary),
    Failed(String),
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Succeeded(_) | UploadStatus::Failed(_))
    }
}

/// Everything needed to perform one upload, detached from the flow so it can
/// run on another task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    pub file: CsvFile,
    /// Named collection to create from the file; `None` ingests into the
    /// default collection.
    pub target: Option<String>,
}

impl UploadTicket {
    pub async fn send(&self, api: &dyn SearchApi) -> Result<IngestSummary> {
        match &self.target {
            Some(name) => api.create_collection(name, &self.file).await,
            None => api.upload_csv(&self.file).await,
        }
    }
}

/// Drives CSV ingestion: pick a file, upload it once, report the counts.
#[derive(Debug, Default)]
pub struct UploadFlow {
    file: Option<CsvFile>,
    target: Option<String>,
    status: UploadStatus,
}

impl UploadFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn selected(&self) -> Option<&CsvFile> {
        self.file.as_ref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_uploading(&self) -> bool {
        self.status == UploadStatus::Uploading
    }

    pub fn can_submit(&self) -> bool {
        self.file.is_some() && !self.is_uploading()
    }

    /// Choose the file to upload. Returns `false` if ignored because an
    /// upload is in flight.
    ///
    /// A previous success or failure is cleared back to `Idle`.
    pub fn select(&mut self, file: CsvFile) -> std::result::Result<bool, ValidationError> {
        if self.is_uploading() {
            return Ok(false);
        }
        if !file.looks_like_csv() {
            return Err(ValidationError::NotCsv {
                filename: file.filename,
            });
        }

        debug!(filename = %file.filename, bytes = file.size(), "file selected");
        self.file = Some(file);
        self.status = UploadStatus::Idle;
        Ok(true)
    }

    /// Ingest into a new named collection instead of the default one.
    pub fn set_target(&mut self, name: Option<&str>) -> std::result::Result<(), ValidationError> {
        match name {
            Some(raw) => {
                let name = normalize_collection(Some(raw))
                    .ok_or(ValidationError::EmptyCollectionName)?;
                self.target = Some(name);
            }
            None => self.target = None,
        }
        Ok(())
    }

    /// Enter `Uploading` and hand out the work to perform, or `None` if an
    /// upload is already in flight.
    pub fn submit(&mut self) -> std::result::Result<Option<UploadTicket>, ValidationError> {
        if self.is_uploading() {
            debug!("upload already in flight, ignoring submit");
            return Ok(None);
        }
        let file = self.file.clone().ok_or(ValidationError::NoFileSelected)?;

        self.status = UploadStatus::Uploading;
        Ok(Some(UploadTicket {
            file,
            target: self.target.clone(),
        }))
    }

    /// Record the outcome of the in-flight upload. Success clears the
    /// selected file; failure keeps it for a retry.
    pub fn complete(&mut self, outcome: Result<IngestSummary>) -> bool {
        if !self.is_uploading() {
            return false;
        }

        self.status = match outcome {
            Ok(summary) => {
                debug!(
                    ingested = ?summary.ingested_count,
                    errors = ?summary.error_count,
                    "upload succeeded"
                );
                self.file = None;
                UploadStatus::Succeeded(summary)
            }
            Err(err) => {
                debug!(error = %err, "upload failed");
                UploadStatus::Failed(err.user_message())
            }
        };
        true
    }

    /// Forget the selected file and any outcome.
    pub fn clear(&mut self) {
        if self.is_uploading() {
            return;
        }
        self.file = None;
        self.status = UploadStatus::Idle;
    }

    pub async fn run(
        &mut self,
        api: &dyn SearchApi,
    ) -> std::result::Result<&UploadStatus, ValidationError> {
        if let Some(ticket) = self.submit()? {
            let outcome = ticket.send(api).await;
            self.complete(outcome);
        }
        Ok(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ClientError, flows::testing::FakeApi};

    fn csv(name: &str) -> CsvFile {
        CsvFile::new(name, Some("text/csv".to_string()), b"video_id\nabc\n".to_vec())
    }

    fn summary(ingested: u64, errors: u64) -> IngestSummary {
        IngestSummary {
            status: Some("success".to_string()),
            ingested_count: Some(ingested),
            error_count: Some(errors),
            message: format!("Ingested {ingested} videos"),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_non_csv() {
        let mut flow = UploadFlow::new();
        let err = flow
            .select(CsvFile::new("report.pdf", Some("application/pdf".into()), vec![]))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotCsv {
                filename: "report.pdf".to_string()
            }
        );
        assert!(flow.selected().is_none());
    }

    #[test]
    fn submit_without_file_fails() {
        let mut flow = UploadFlow::new();
        assert_eq!(flow.submit(), Err(ValidationError::NoFileSelected));
        assert_eq!(flow.status(), &UploadStatus::Idle);
    }

    #[test]
    fn second_submit_while_uploading_is_ignored() {
        let mut flow = UploadFlow::new();
        flow.select(csv("videos.csv")).unwrap();
        assert!(flow.submit().unwrap().is_some());
        assert_eq!(flow.submit(), Ok(None));
        assert_eq!(flow.select(csv("other.csv")), Ok(false));
        assert_eq!(flow.selected().unwrap().filename, "videos.csv");
    }

    #[test]
    fn success_clears_file_and_reports_counts_verbatim() {
        let mut flow = UploadFlow::new();
        flow.select(csv("videos.csv")).unwrap();
        flow.submit().unwrap();
        assert!(flow.complete(Ok(summary(10, 2))));

        assert_eq!(flow.status(), &UploadStatus::Succeeded(summary(10, 2)));
        assert!(flow.selected().is_none());
        assert!(!flow.can_submit());
    }

    #[test]
    fn failure_keeps_file_for_retry() {
        let mut flow = UploadFlow::new();
        flow.select(csv("videos.csv")).unwrap();
        flow.submit().unwrap();
        flow.complete(Err(ClientError::Api {
            status: 400,
            detail: Some("File must be a CSV".to_string()),
        }));

        assert_eq!(
            flow.status(),
            &UploadStatus::Failed("File must be a CSV".to_string())
        );
        assert!(flow.can_submit());
    }

    #[test]
    fn selecting_resets_terminal_state() {
        let mut flow = UploadFlow::new();
        flow.select(csv("videos.csv")).unwrap();
        flow.submit().unwrap();
        flow.complete(Err(ClientError::network("refused")));
        assert!(flow.status().is_terminal());

        flow.select(csv("again.csv")).unwrap();
        assert_eq!(flow.status(), &UploadStatus::Idle);
    }

    #[test]
    fn blank_target_is_rejected() {
        let mut flow = UploadFlow::new();
        assert_eq!(
            flow.set_target(Some("  ")),
            Err(ValidationError::EmptyCollectionName)
        );
        flow.set_target(Some(" lectures ")).unwrap();
        assert_eq!(flow.target(), Some("lectures"));
        flow.set_target(None).unwrap();
        assert_eq!(flow.target(), None);
    }

    #[tokio::test]
    async fn run_uses_target_collection() {
        let api = FakeApi {
            ingest: Ok(summary(3, 0)),
            ..Default::default()
        };
        let mut flow = UploadFlow::new();
        flow.select(csv("videos.csv")).unwrap();
        flow.set_target(Some("lectures")).unwrap();

        let status = flow.run(&api).await.unwrap();
        assert_eq!(status, &UploadStatus::Succeeded(summary(3, 0)));
        assert_eq!(api.calls(), ["create:lectures:videos.csv"]);
    }

    #[tokio::test]
    async fn run_defaults_to_upload_endpoint() {
        let api = FakeApi::default();
        let mut flow = UploadFlow::new();
        flow.select(csv("videos.csv")).unwrap();
        flow.run(&api).await.unwrap();
        assert_eq!(api.calls(), ["upload:videos.csv"]);
    }
}
