/// Thumbnail sizes published by YouTube for every video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailQuality {
    Default,
    Medium,
    High,
    Standard,
    MaxRes,
}

impl ThumbnailQuality {
    fn file_name(self) -> &'static str {
        match self {
            ThumbnailQuality::Default => "default.jpg",
            ThumbnailQuality::Medium => "mqdefault.jpg",
            ThumbnailQuality::High => "hqdefault.jpg",
            ThumbnailQuality::Standard => "sddefault.jpg",
            ThumbnailQuality::MaxRes => "maxresdefault.jpg",
        }
    }
}

pub fn thumbnail_url(video_id: &str, quality: ThumbnailQuality) -> String {
    format!("https://img.youtube.com/vi/{}/{}", video_id, quality.file_name())
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

const VIDEO_ID_LEN: usize = 11;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Take the 11-character id out of a YouTube URL.
///
/// Handles `watch?v=`, `youtu.be/`, `/shorts/` and `/embed/` links. Any
/// other input is returned trimmed, so bare ids and non-YouTube ids pass
/// through unchanged.
pub fn extract_video_id(input: &str) -> String {
    let input = input.trim();
    if !input.contains('/') && !input.contains('=') {
        return input.to_string();
    }

    let markers = ["v=", "youtu.be/", "/shorts/", "/embed/", "/live/", "/v/"];
    for marker in markers {
        let Some(pos) = input.find(marker) else {
            continue;
        };
        let candidate: String = input[pos + marker.len()..]
            .chars()
            .take_while(|c| is_id_char(*c))
            .collect();
        if candidate.len() == VIDEO_ID_LEN {
            return candidate;
        }
    }

    input.to_string()
}
