use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;
use vidseek_core::{
    ClientConfig, CsvFile, HttpClient, SearchApi, SearchFlow, SearchState, SummaryFlow,
    SummaryState, UploadFlow, UploadStatus, extract_video_id,
    format::format_video_readable,
};

use crate::render::{
    create_spinner, format_elapsed, print_header, print_health, print_ingest, print_json,
    print_notice, print_results, print_rule, print_summary,
};

mod render;
mod shell;

#[derive(Parser)]
#[command(name = "vidseek", version)]
#[command(about = "Upload video datasets, run semantic search, and read AI summaries")]
struct Cli {
    /// Base URL of the search service (e.g. http://127.0.0.1:8000)
    #[arg(long, global = true, env = "API_BASE_URL")]
    api_base_url: Option<String>,

    /// Config file. Defaults to ~/.config/vidseek/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the search service is up
    Health,

    /// Search ingested videos by meaning
    Search {
        /// Search text
        #[arg(required = true)]
        query: Vec<String>,

        /// Number of results (1-20). Defaults to the configured limit.
        #[arg(short = 'k', long)]
        limit: Option<u32>,

        /// Search within a named collection
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Upload a CSV of videos for ingestion
    Upload {
        file: PathBuf,

        /// Create a named collection from the file
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Show stored details for one video
    Video {
        /// Video id or YouTube link
        video: String,

        /// Look the video up in a named collection
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Generate an AI summary for one video
    Summarize {
        /// Video id or YouTube link
        video: String,

        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Inspect or remove collections
    Collections {
        #[command(subcommand)]
        action: CollectionsCommand,
    },

    /// Interactive session
    Shell {
        /// Start inside a named collection
        #[arg(short, long)]
        collection: Option<String>,
    },
}

#[derive(Subcommand)]
enum CollectionsCommand {
    /// List collections reported by the service
    List,

    /// Delete a collection and everything in it
    Delete { name: String },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "vidseek=debug,vidseek_core=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::load(cli.config.clone())?;
    if let Some(url) = cli.api_base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        config = config.with_base_url(url)?;
    }
    tracing::debug!(api_base_url = %config.api_base_url, "configuration loaded");

    let default_limit = config.default_result_limit;
    let client = HttpClient::new(config)?;
    let json = cli.json;

    match cli.command {
        Command::Health => health(&client, json).await,
        Command::Search {
            query,
            limit,
            collection,
        } => {
            let text = query.join(" ");
            search(
                &client,
                &text,
                limit.unwrap_or(default_limit),
                collection.as_deref(),
                json,
            )
            .await
        }
        Command::Upload { file, collection } => upload(&client, file, collection, json).await,
        Command::Video { video, collection } => {
            video_details(&client, &video, collection.as_deref(), json).await
        }
        Command::Summarize { video, collection } => {
            summarize(&client, &video, collection.as_deref(), json).await
        }
        Command::Collections { action } => collections(&client, action, json).await,
        Command::Shell { collection } => {
            let api: Arc<dyn SearchApi> = Arc::new(client);
            let (session, completions) = shell::Session::new(api, default_limit, collection);
            shell::run(session, completions).await
        }
    }
}

async fn health(client: &HttpClient, json: bool) -> Result<()> {
    let spinner = create_spinner(&format!("Contacting {}...", client.base_url()));
    let outcome = client.health().await;
    spinner.finish_and_clear();

    let health = outcome.map_err(|e| anyhow::anyhow!(e.user_message()))?;
    if json {
        return print_json(&health);
    }
    print_health(&health);
    Ok(())
}

async fn search(
    client: &HttpClient,
    text: &str,
    limit: u32,
    collection: Option<&str>,
    json: bool,
) -> Result<()> {
    if !json {
        print_header();
    }

    let started = Instant::now();
    let spinner = create_spinner(&format!("Searching for \"{}\"...", text.trim()));
    let mut flow = SearchFlow::new();
    let state = flow.run(client, text, limit, collection).await.cloned();
    spinner.finish_and_clear();

    match state? {
        SearchState::Success { response, .. } => {
            if json {
                return print_json(&response);
            }
            print_results(&response);
            println!(
                "{} {}",
                style("Search time:").dim(),
                style(format_elapsed(started.elapsed())).cyan()
            );
        }
        SearchState::Empty { .. } => {
            if json {
                return print_json(&serde_json::json!({ "results": [] }));
            }
            print_notice(flow.notice().unwrap_or("No results"));
        }
        SearchState::Error { message, .. } => bail!("{message}"),
        SearchState::Idle | SearchState::Searching { .. } => {}
    }
    Ok(())
}

async fn upload(
    client: &HttpClient,
    path: PathBuf,
    collection: Option<String>,
    json: bool,
) -> Result<()> {
    let file = CsvFile::from_path(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut flow = UploadFlow::new();
    flow.select(file)?;
    flow.set_target(collection.as_deref())?;

    let started = Instant::now();
    let spinner = create_spinner(&format!(
        "Uploading {} to {}...",
        path.display(),
        flow.target().unwrap_or("the default collection")
    ));
    let status = flow.run(client).await.cloned();
    spinner.finish_and_clear();

    match status? {
        UploadStatus::Succeeded(summary) => {
            if json {
                return print_json(&summary);
            }
            print_ingest(&summary);
            println!(
                "{} {}",
                style("Upload time:").dim(),
                style(format_elapsed(started.elapsed())).cyan()
            );
        }
        UploadStatus::Failed(message) => bail!("{message}"),
        UploadStatus::Idle | UploadStatus::Uploading => {}
    }
    Ok(())
}

async fn video_details(
    client: &HttpClient,
    video: &str,
    collection: Option<&str>,
    json: bool,
) -> Result<()> {
    let video_id = extract_video_id(video);
    if video_id.is_empty() {
        bail!(vidseek_core::ValidationError::EmptyVideoId);
    }
    let collection = collection.map(str::trim).filter(|c| !c.is_empty());

    let spinner = create_spinner(&format!("Fetching {video_id}..."));
    let outcome = client.fetch_video(&video_id, collection).await;
    spinner.finish_and_clear();

    let detail = outcome.map_err(|e| anyhow::anyhow!(e.user_message()))?;
    if json {
        return print_json(&detail);
    }
    print_rule();
    println!("{}", format_video_readable(&detail));
    Ok(())
}

async fn summarize(
    client: &HttpClient,
    video: &str,
    collection: Option<&str>,
    json: bool,
) -> Result<()> {
    let started = Instant::now();
    let spinner = create_spinner("Generating summary...");
    let mut flow = SummaryFlow::new();
    let state = flow.run(client, video, collection).await.cloned();
    spinner.finish_and_clear();

    match state? {
        SummaryState::Ready(summary) => {
            if json {
                return print_json(&summary);
            }
            println!(
                "{} Summary generated {}",
                style("✓").green().bold(),
                style(format!("[{}]", format_elapsed(started.elapsed()))).dim()
            );
            print_summary(&summary);
        }
        SummaryState::Failed { message, .. } => bail!("{message}"),
        SummaryState::Closed | SummaryState::Loading { .. } => {}
    }
    Ok(())
}

async fn collections(client: &HttpClient, action: CollectionsCommand, json: bool) -> Result<()> {
    match action {
        CollectionsCommand::List => {
            let health = client
                .health()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if json {
                return print_json(&health.databases);
            }
            if health.databases.is_empty() {
                print_notice("The service reported no collections");
            }
            for db in &health.databases {
                match db.record_count {
                    Some(count) => println!(
                        "{} {}",
                        style(&db.name).cyan(),
                        style(format!("({count} records)")).dim()
                    ),
                    None => println!("{}", style(&db.name).cyan()),
                }
            }
        }
        CollectionsCommand::Delete { name } => {
            let name = name.trim();
            if name.is_empty() {
                bail!(vidseek_core::ValidationError::EmptyCollectionName);
            }
            let message = client
                .delete_collection(name)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if json {
                return print_json(&serde_json::json!({ "message": message }));
            }
            println!("{} {}", style("✓").green().bold(), message);
        }
    }
    Ok(())
}
