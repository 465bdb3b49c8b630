// classify.rs - URL Classification
// Decides whether the inbound chat text is a URL, and if so whether it points
// at a video host (subtitle path) or anything else (article path).

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Command keyword typed in the messenger room before the URL.
pub const COMMAND_KEYWORD: &str = "분석 ";

const VIDEO_HOSTS: [&str; 3] = ["youtube.com", "youtu.be", "youtube-nocookie.com"];

static URL_PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://").expect("Invalid URL prefix regex pattern"));

// One pattern per known URL shape; ids are always 11 chars.
static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"[?&]v=([0-9A-Za-z_-]{11})(?:[&#]|$)",
        r"youtu\.be/([0-9A-Za-z_-]{11})(?:[?&#/]|$)",
        r"/embed/([0-9A-Za-z_-]{11})(?:[?&#/]|$)",
        r"/shorts/([0-9A-Za-z_-]{11})(?:[?&#/]|$)",
        r"/live/([0-9A-Za-z_-]{11})(?:[?&#/]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid video id regex pattern"))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Article,
    Video,
}

/// Short token identifying a video on the hosting site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Removes a leading `분석 ` command keyword, if present, and trims the rest.
pub fn strip_command_keyword(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix(COMMAND_KEYWORD).map(str::trim).unwrap_or(text)
}

pub fn is_url(text: &str) -> bool {
    URL_PREFIX_REGEX.is_match(text.trim())
}

pub fn is_video_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    VIDEO_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{}", known)))
}

/// Article unless the host is on the video allow-list. Callers check `is_url` first.
pub fn classify(url: &str) -> SourceKind {
    let host = Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));

    match host {
        Some(host) if is_video_host(&host) => SourceKind::Video,
        _ => SourceKind::Article,
    }
}

pub fn extract_video_id(url: &str) -> Option<VideoId> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()))
}
