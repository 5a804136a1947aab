use std::time::Duration;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use vidseek_core::{
    FlowError, HealthStatus, IngestSummary, SearchResponse, SummaryResult, VideoCard, to_cards,
    format::{format_health_readable, format_ingest_readable, format_summary_readable},
};

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

pub fn print_header() {
    println!(
        "\n{}  {}\n",
        style("vidseek").cyan().bold(),
        style("Semantic Video Search").dim()
    );
}

pub fn print_rule() {
    println!("{}", style("─".repeat(60)).dim());
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

pub fn print_notice(msg: &str) {
    println!("{} {}", style("!").yellow().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

pub fn print_flow_error(err: impl Into<FlowError>) {
    print_error(&err.into().user_message());
}

pub fn print_card(card: &VideoCard) {
    println!(
        "{:>2}. {}  {}",
        card.rank,
        style(&card.title).bold(),
        style(&card.score_label).cyan()
    );
    println!(
        "    {} · {} views · {} likes · {}",
        card.channel, card.views, card.likes, card.duration
    );
    if let Some(relevance) = &card.relevance {
        println!("    {} {}", style("relevance:").dim(), relevance);
    }
    println!("    {}", style(&card.watch_url).underlined());
    if let Some(snippet) = &card.snippet {
        println!("    {}", style(snippet).dim());
    }
}

pub fn print_results(response: &SearchResponse) {
    let cards = to_cards(&response.results);
    let total = response
        .total_results
        .unwrap_or(cards.len() as u64);
    println!(
        "{} {} result(s)",
        style("✓").green().bold(),
        style(total).cyan().bold()
    );
    print_rule();
    for card in &cards {
        print_card(card);
        println!();
    }
}

pub fn print_summary(summary: &SummaryResult) {
    print_rule();
    println!("{}", format_summary_readable(summary));
}

pub fn print_ingest(summary: &IngestSummary) {
    print_success("Upload complete");
    print!("{}", format_ingest_readable(summary));
}

pub fn print_health(health: &HealthStatus) {
    if health.is_healthy() {
        print_success("Search service is healthy");
    } else {
        print_notice(&format!("Search service reports '{}'", health.status));
    }
    print!("{}", format_health_readable(health));
}

pub fn print_shell_help() {
    let rows = [
        ("search <query>", "run a semantic search"),
        ("limit <n>", "results per search (1-20)"),
        ("use <collection>", "search, summarize and upload within a collection ('use -' resets)"),
        ("summary <id|url>", "open the AI summary for a video"),
        ("close", "close the summary panel"),
        ("select <path>", "pick a CSV file to upload"),
        ("upload", "upload the selected CSV"),
        ("clear", "clear search results and the selected file"),
        ("health", "check the search service"),
        ("help", "show this list"),
        ("quit", "leave the shell"),
    ];
    for (command, about) in rows {
        println!("  {:<20} {}", style(command).cyan(), style(about).dim());
    }
}
