use crate::types::{HealthStatus, IngestSummary, SummaryResult, VideoDetail};

pub const NOT_AVAILABLE: &str = "N/A";

/// Format a view/like count as 1.2M, 3.4K, or the plain integer
pub fn format_count(count: Option<u64>) -> String {
    match count {
        Some(n) if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        Some(n) if n >= 1_000 => format!("{:.1}K", n as f64 / 1_000.0),
        Some(n) => n.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Format seconds as M:SS
pub fn format_duration(seconds: Option<u64>) -> String {
    match seconds {
        Some(s) if s > 0 => format!("{}:{:02}", s / 60, s % 60),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Relevance score as a percentage, for display only
pub fn format_score(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

pub fn format_score_decimal(score: f64) -> String {
    format!("{:.3}", score)
}

/// Shorten text to at most `max_chars` characters, ending with an ellipsis
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// Format a summary as human-readable markdown
pub fn format_summary_readable(summary: &SummaryResult) -> String {
    let mut output = String::new();

    let title = if summary.title.is_empty() {
        summary.video_id.as_str()
    } else {
        summary.title.as_str()
    };
    output.push_str(&format!("# {}\n\n", title));

    output.push_str(&format!(
        "**Channel:** {} | **Views:** {} | **Duration:** {}\n\n",
        summary.channel_title.as_deref().unwrap_or(NOT_AVAILABLE),
        format_count(summary.view_count),
        format_duration(summary.duration_seconds)
    ));

    output.push_str("## Summary\n\n");
    output.push_str(&summary.summary_text);
    output.push_str("\n\n");

    if let Some(stats) = &summary.statistics {
        output.push_str("## Transcript\n\n");
        output.push_str(&format!("• Length: {} characters\n", stats.transcript_length));
        output.push_str(&format!("• Words: {}\n", stats.word_count));
        output.push_str(&format!("• Sentences: {}\n", stats.sentence_count));
        output.push_str(&format!(
            "• Average word length: {:.2}\n",
            stats.avg_word_length
        ));
        output.push('\n');
    }

    output.push_str(&format!(
        "_Generated {}_\n",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

pub fn format_ingest_readable(summary: &IngestSummary) -> String {
    let mut output = String::new();
    if !summary.message.is_empty() {
        output.push_str(&summary.message);
        output.push('\n');
    }
    let count = |n: Option<u64>| n.map_or_else(|| NOT_AVAILABLE.to_string(), |n| n.to_string());
    output.push_str(&format!(
        "Ingested: {} | Errors: {}",
        count(summary.ingested_count),
        count(summary.error_count)
    ));
    if let Some(chunks) = summary.total_chunks {
        output.push_str(&format!(" | Chunks: {}", chunks));
    }
    output.push('\n');
    output
}

pub fn format_video_readable(video: &VideoDetail) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", video.title));
    output.push_str(&format!(
        "**ID:** {} | **Channel:** {} | **Views:** {} | **Likes:** {} | **Duration:** {}\n\n",
        video.video_id,
        video.channel_title.as_deref().unwrap_or(NOT_AVAILABLE),
        format_count(video.view_count),
        format_count(video.like_count),
        format_duration(video.duration_seconds)
    ));

    if let Some(transcript) = &video.transcript {
        output.push_str("## Transcript\n\n");
        output.push_str(transcript.trim());
        output.push('\n');
    }

    output
}

pub fn format_health_readable(health: &HealthStatus) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "API status: {}\n",
        if health.is_healthy() {
            "healthy"
        } else {
            health.status.as_str()
        }
    ));
    if let Some(version) = &health.api_version {
        output.push_str(&format!("API version: {}\n", version));
    }
    output.push_str(&format!("Total videos: {}\n", health.total_videos));
    output.push_str(&format!(
        "Search engine: {}\n",
        if health.search_engine_ready {
            "ready"
        } else {
            "not ready"
        }
    ));

    if !health.databases.is_empty() {
        output.push_str("Collections:\n");
        for db in &health.databases {
            match db.record_count {
                Some(count) => output.push_str(&format!("• {} ({} records)\n", db.name, count)),
                None => output.push_str(&format!("• {}\n", db.name)),
            }
        }
    }

    output
}
