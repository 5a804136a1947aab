use std::{path::PathBuf, str::FromStr, sync::Arc};

use anyhow::Result;
use console::style;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, warn};
use vidseek_core::{
    ClientError, CsvFile, HealthStatus, IngestSummary, RequestId, SearchApi, SearchFlow,
    SearchResponse, SearchState, SummaryFlow, SummaryResult, SummaryState, UploadFlow,
    UploadStatus, ValidationError,
    types::{MAX_RESULT_LIMIT, MIN_RESULT_LIMIT},
};

use crate::render;

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Search(String),
    Limit(u32),
    /// `None` switches back to the default collection.
    Use(Option<String>),
    Summary(String),
    Close,
    Select(PathBuf),
    Upload,
    Clear,
    Health,
    Help,
    Quit,
    Empty,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let command = match command.to_ascii_lowercase().as_str() {
            "" => ShellCommand::Empty,
            "search" | "s" => ShellCommand::Search(rest.to_string()),
            "limit" | "k" => {
                let limit = rest
                    .parse()
                    .map_err(|_| format!("'limit' expects a number, got '{rest}'"))?;
                ShellCommand::Limit(limit)
            }
            "use" => match rest {
                "" => return Err("'use' expects a collection name, or '-' for the default".into()),
                "-" => ShellCommand::Use(None),
                name => ShellCommand::Use(Some(name.to_string())),
            },
            "summary" | "sum" => ShellCommand::Summary(rest.to_string()),
            "close" => ShellCommand::Close,
            "select" => {
                if rest.is_empty() {
                    return Err("'select' expects a path to a CSV file".into());
                }
                ShellCommand::Select(PathBuf::from(rest))
            }
            "upload" => ShellCommand::Upload,
            "clear" => ShellCommand::Clear,
            "health" => ShellCommand::Health,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => return Err(format!("Unknown command '{other}'. Type 'help' for a list.")),
        };
        Ok(command)
    }
}

/// Result of a request that ran on a background task.
#[derive(Debug)]
pub enum Completion {
    Search(Result<SearchResponse, ClientError>),
    Upload(Result<IngestSummary, ClientError>),
    Summary(RequestId, Result<SummaryResult, ClientError>),
    Health(Result<HealthStatus, ClientError>),
}

/// Interactive session. Requests run on spawned tasks and report back over
/// a channel, so the prompt stays usable while they are in flight.
pub struct Session {
    api: Arc<dyn SearchApi>,
    search: SearchFlow,
    upload: UploadFlow,
    summary: SummaryFlow,
    result_limit: u32,
    collection: Option<String>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl Session {
    pub fn new(
        api: Arc<dyn SearchApi>,
        result_limit: u32,
        collection: Option<String>,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            api,
            search: SearchFlow::new(),
            upload: UploadFlow::new(),
            summary: SummaryFlow::new(),
            result_limit,
            collection,
            completions: tx,
        };
        (session, rx)
    }

    pub fn search(&self) -> &SearchFlow {
        &self.search
    }

    pub fn upload(&self) -> &UploadFlow {
        &self.upload
    }

    pub fn summary(&self) -> &SummaryFlow {
        &self.summary
    }

    /// Run `request` on its own task. If that task dies before producing a
    /// completion, `on_abort` builds one so the owning flow is released.
    fn spawn<F, A>(&self, request: F, on_abort: A)
    where
        F: Future<Output = Completion> + Send + 'static,
        A: FnOnce(ClientError) -> Completion + Send + 'static,
    {
        let tx = self.completions.clone();
        let task = tokio::spawn(request);
        tokio::spawn(async move {
            let completion = match task.await {
                Ok(completion) => completion,
                Err(e) => {
                    warn!(error = %e, "background request aborted");
                    on_abort(ClientError::unexpected(format!("request task failed: {e}")))
                }
            };
            // The receiver only goes away when the shell is exiting.
            let _ = tx.send(completion);
        });
    }

    /// Apply one command. Returns `false` when the shell should exit.
    pub async fn execute(&mut self, command: ShellCommand) -> bool {
        match command {
            ShellCommand::Empty => {}
            ShellCommand::Quit => return false,
            ShellCommand::Help => render::print_shell_help(),
            ShellCommand::Search(text) => self.start_search(&text),
            ShellCommand::Limit(limit) => {
                if (MIN_RESULT_LIMIT..=MAX_RESULT_LIMIT).contains(&limit) {
                    self.result_limit = limit;
                    render::print_success(&format!("Showing up to {limit} results"));
                } else {
                    render::print_flow_error(ValidationError::ResultLimitOutOfRange { limit });
                }
            }
            ShellCommand::Use(collection) => {
                if let Err(e) = self.upload.set_target(collection.as_deref()) {
                    render::print_flow_error(e);
                    return true;
                }
                match &collection {
                    Some(name) => render::print_success(&format!("Using collection '{name}'")),
                    None => render::print_success("Using the default collection"),
                }
                self.collection = collection;
            }
            ShellCommand::Summary(video) => self.start_summary(&video),
            ShellCommand::Close => {
                self.summary.close();
                render::print_success("Summary closed");
            }
            ShellCommand::Select(path) => self.select_file(path).await,
            ShellCommand::Upload => self.start_upload(),
            ShellCommand::Clear => {
                self.search.clear();
                self.upload.clear();
                render::print_success("Cleared");
            }
            ShellCommand::Health => {
                let api = Arc::clone(&self.api);
                self.spawn(
                    async move { Completion::Health(api.health().await) },
                    |e| Completion::Health(Err(e)),
                );
                println!("{}", style("Checking service health...").dim());
            }
        }
        true
    }

    fn start_search(&mut self, text: &str) {
        match self
            .search
            .submit(text, self.result_limit, self.collection.as_deref())
        {
            Ok(Some(query)) => {
                println!(
                    "{}",
                    style(format!("Searching for \"{}\"...", query.text())).dim()
                );
                let api = Arc::clone(&self.api);
                self.spawn(
                    async move { Completion::Search(api.search(&query).await) },
                    |e| Completion::Search(Err(e)),
                );
            }
            Ok(None) => render::print_notice("A search is already running"),
            Err(e) => render::print_flow_error(e),
        }
    }

    fn start_summary(&mut self, video: &str) {
        match self.summary.request(video, self.collection.as_deref()) {
            Ok(ticket) => {
                println!(
                    "{}",
                    style(format!(
                        "Generating summary for {}...",
                        ticket.request.video_id
                    ))
                    .dim()
                );
                let id = ticket.id;
                let api = Arc::clone(&self.api);
                self.spawn(
                    async move {
                        let outcome = ticket.send(api.as_ref()).await;
                        Completion::Summary(ticket.id, outcome)
                    },
                    move |e| Completion::Summary(id, Err(e)),
                );
            }
            Err(e) => render::print_flow_error(e),
        }
    }

    async fn select_file(&mut self, path: PathBuf) {
        let file = match CsvFile::from_path(&path).await {
            Ok(file) => file,
            Err(e) => {
                render::print_error(&format!("Could not read {}: {e}", path.display()));
                return;
            }
        };

        let filename = file.filename.clone();
        let size = file.size();
        match self.upload.select(file) {
            Ok(true) => render::print_success(&format!("Selected {filename} ({size} bytes)")),
            Ok(false) => render::print_notice("An upload is already running"),
            Err(e) => render::print_flow_error(e),
        }
    }

    fn start_upload(&mut self) {
        match self.upload.submit() {
            Ok(Some(ticket)) => {
                let target = ticket.target.as_deref().unwrap_or("default collection");
                println!(
                    "{}",
                    style(format!("Uploading {} to {target}...", ticket.file.filename)).dim()
                );
                let api = Arc::clone(&self.api);
                self.spawn(
                    async move { Completion::Upload(ticket.send(api.as_ref()).await) },
                    |e| Completion::Upload(Err(e)),
                );
            }
            Ok(None) => render::print_notice("An upload is already running"),
            Err(e) => render::print_flow_error(e),
        }
    }

    /// Fold a finished request into the matching flow and show the outcome.
    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Search(outcome) => {
                if !self.search.complete(outcome) {
                    return;
                }
                match self.search.state() {
                    SearchState::Success { response, .. } => render::print_results(response),
                    SearchState::Error { message, .. } => render::print_error(message),
                    _ => {
                        if let Some(notice) = self.search.notice() {
                            render::print_notice(notice);
                        }
                    }
                }
            }
            Completion::Upload(outcome) => {
                if !self.upload.complete(outcome) {
                    return;
                }
                match self.upload.status() {
                    UploadStatus::Succeeded(summary) => render::print_ingest(summary),
                    UploadStatus::Failed(message) => render::print_error(message),
                    _ => {}
                }
            }
            Completion::Summary(id, outcome) => {
                if !self.summary.resolve(id, outcome) {
                    debug!(%id, "summary no longer wanted");
                    return;
                }
                match self.summary.state() {
                    SummaryState::Ready(summary) => render::print_summary(summary),
                    SummaryState::Failed { video_id, message } => {
                        render::print_error(&format!("Summary for {video_id} failed: {message}"))
                    }
                    _ => {}
                }
            }
            Completion::Health(Ok(health)) => render::print_health(&health),
            Completion::Health(Err(e)) => render::print_error(&e.user_message()),
        }
    }
}

async fn prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{} ", style("vidseek>").cyan().bold()).as_bytes())
        .await?;
    stdout.flush().await?;
    Ok(())
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(
    mut session: Session,
    mut completions: mpsc::UnboundedReceiver<Completion>,
) -> Result<()> {
    render::print_header();
    println!("{}", style("Type 'help' for commands.").dim());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt().await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.parse::<ShellCommand>() {
                    Ok(command) => {
                        if !session.execute(command).await {
                            break;
                        }
                    }
                    Err(msg) => render::print_error(&msg),
                }
                prompt().await?;
            }
            Some(completion) = completions.recv() => {
                println!();
                session.apply(completion);
                prompt().await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockito::{Matcher, Server};
    use vidseek_core::{
        ClientConfig, HttpClient, Result as ApiResult, SearchQuery, SummaryRequest, VideoDetail,
    };

    fn session(base_url: &str) -> (Session, mpsc::UnboundedReceiver<Completion>) {
        let config = ClientConfig::default().with_base_url(base_url).unwrap();
        let api: Arc<dyn SearchApi> = Arc::new(HttpClient::new(config).unwrap());
        Session::new(api, 5, None)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            "search  machine learning ".parse::<ShellCommand>(),
            Ok(ShellCommand::Search("machine learning".into()))
        );
        assert_eq!("LIMIT 10".parse::<ShellCommand>(), Ok(ShellCommand::Limit(10)));
        assert_eq!(
            "use lectures".parse::<ShellCommand>(),
            Ok(ShellCommand::Use(Some("lectures".into())))
        );
        assert_eq!("use -".parse::<ShellCommand>(), Ok(ShellCommand::Use(None)));
        assert_eq!(
            "select ./data/videos.csv".parse::<ShellCommand>(),
            Ok(ShellCommand::Select(PathBuf::from("./data/videos.csv")))
        );
        assert_eq!("   ".parse::<ShellCommand>(), Ok(ShellCommand::Empty));
        assert_eq!("exit".parse::<ShellCommand>(), Ok(ShellCommand::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!("limit many".parse::<ShellCommand>().is_err());
        assert!("use".parse::<ShellCommand>().is_err());
        assert!("select".parse::<ShellCommand>().is_err());
        assert!("frobnicate".parse::<ShellCommand>().is_err());
    }

    #[tokio::test]
    async fn search_runs_in_background_and_completes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("query".into(), "rust".into()))
            .with_status(200)
            .with_body(
                r#"{"results": [{"video_id": "abc123", "title": "Rust", "relevance_score": 0.9}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let (mut session, mut completions) = session(&server.url());
        assert!(session.execute(ShellCommand::Search("rust".into())).await);
        assert!(session.search().is_searching());

        // A second search while the first is running sends nothing.
        session.execute(ShellCommand::Search("go".into())).await;

        let completion = completions.recv().await.unwrap();
        session.apply(completion);

        mock.assert_async().await;
        assert_eq!(session.search().results().len(), 1);
    }

    #[tokio::test]
    async fn blank_search_sends_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (mut session, _completions) = session(&server.url());
        session.execute(ShellCommand::Search("   ".into())).await;

        assert!(!session.search().is_searching());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stale_summary_is_dropped() {
        let mut server = Server::new_async().await;
        for id in ["abc123", "xyz789"] {
            server
                .mock("GET", format!("/summarize/{id}").as_str())
                .with_status(200)
                .with_body(format!(r#"{{"video_id": "{id}", "summary": "About {id}"}}"#))
                .create_async()
                .await;
        }

        let (mut session, mut completions) = session(&server.url());
        session.execute(ShellCommand::Summary("abc123".into())).await;
        session.execute(ShellCommand::Summary("xyz789".into())).await;

        for _ in 0..2 {
            let completion = completions.recv().await.unwrap();
            session.apply(completion);
        }

        match session.summary().state() {
            SummaryState::Ready(summary) => assert_eq!(summary.video_id, "xyz789"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    /// Every request it receives panics mid-flight.
    struct PanickingApi;

    #[async_trait]
    impl SearchApi for PanickingApi {
        async fn upload_csv(&self, _file: &CsvFile) -> ApiResult<IngestSummary> {
            panic!("upload exploded")
        }

        async fn search(&self, _query: &SearchQuery) -> ApiResult<SearchResponse> {
            panic!("search exploded")
        }

        async fn fetch_video(
            &self,
            _video_id: &str,
            _collection: Option<&str>,
        ) -> ApiResult<VideoDetail> {
            panic!("fetch exploded")
        }

        async fn summarize(&self, _request: &SummaryRequest) -> ApiResult<SummaryResult> {
            panic!("summary exploded")
        }

        async fn health(&self) -> ApiResult<HealthStatus> {
            panic!("health exploded")
        }

        async fn create_collection(
            &self,
            _name: &str,
            _file: &CsvFile,
        ) -> ApiResult<IngestSummary> {
            panic!("create exploded")
        }

        async fn delete_collection(&self, _name: &str) -> ApiResult<String> {
            panic!("delete exploded")
        }
    }

    #[tokio::test]
    async fn crashed_search_releases_the_flow() {
        let (mut session, mut completions) = Session::new(Arc::new(PanickingApi), 5, None);
        session.execute(ShellCommand::Search("rust".into())).await;
        assert!(session.search().is_searching());

        let completion = completions.recv().await.unwrap();
        assert!(matches!(completion, Completion::Search(Err(ClientError::Unexpected { .. }))));
        session.apply(completion);

        assert!(!session.search().is_searching());
        assert!(session.search().can_submit());
        assert!(matches!(session.search().state(), SearchState::Error { .. }));
    }

    #[tokio::test]
    async fn crashed_upload_releases_the_flow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos.csv");
        tokio::fs::write(&path, "video_id\nabc123\n").await.unwrap();

        let (mut session, mut completions) = Session::new(Arc::new(PanickingApi), 5, None);
        session.execute(ShellCommand::Select(path)).await;
        session.execute(ShellCommand::Upload).await;
        assert!(session.upload().is_uploading());

        let completion = completions.recv().await.unwrap();
        session.apply(completion);

        assert!(!session.upload().is_uploading());
        assert!(matches!(session.upload().status(), UploadStatus::Failed(_)));
    }

    #[tokio::test]
    async fn crashed_summary_reports_failure() {
        let (mut session, mut completions) = Session::new(Arc::new(PanickingApi), 5, None);
        session.execute(ShellCommand::Summary("abc123".into())).await;

        let completion = completions.recv().await.unwrap();
        session.apply(completion);

        assert!(matches!(
            session.summary().state(),
            SummaryState::Failed { video_id, .. } if video_id == "abc123"
        ));
    }

    #[tokio::test]
    async fn selecting_a_non_csv_keeps_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "hello").await.unwrap();

        let (mut session, _completions) = session("http://127.0.0.1:9");
        session.execute(ShellCommand::Select(path)).await;
        assert!(session.upload().selected().is_none());
    }
}
