// subtitles/youtube.rs - YouTube caption tracks and video metadata
// The watch page embeds `ytInitialPlayerResponse`, whose caption renderer lists
// every available track with a timedtext URL. The first two subtitle strategies
// are built on that listing; the title comes from the public oEmbed endpoint.

use super::{SubtitleError, SubtitleStrategy, VideoTitleLookup, PREFERRED_LANGUAGES};
use crate::classify::VideoId;
use crate::fetch::BROWSER_USER_AGENT;
use async_trait::async_trait;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const TITLE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

const WATCH_URL: &str = "https://www.youtube.com/watch";
const OEMBED_URL: &str = "https://www.youtube.com/oembed";
const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse = ";

/// How long a caption listing (or listing failure) is reused.
pub const LISTING_CACHE_TTL: Duration = Duration::from_secs(60);

static TIMEDTEXT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<text\b[^>]*>(.*?)</text>").expect("Invalid timedtext regex pattern")
});
static INNER_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex pattern"));
static NUMERIC_ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("Invalid numeric entity regex pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    pub name: String,
    /// Auto-generated (speech recognition) rather than uploaded by the creator.
    pub is_generated: bool,
}

/// Lists and downloads caption tracks for a video.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, SubtitleError>;
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<String, SubtitleError>;
}

// Structures for the embedded player response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: String,
    #[serde(default)]
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl From<RawCaptionTrack> for CaptionTrack {
    fn from(raw: RawCaptionTrack) -> Self {
        let name = raw
            .name
            .map(|n| {
                n.simple_text
                    .unwrap_or_else(|| n.runs.into_iter().map(|r| r.text).collect())
            })
            .unwrap_or_default();
        CaptionTrack {
            base_url: raw.base_url,
            language_code: raw.language_code,
            name,
            is_generated: raw.kind.as_deref() == Some("asr"),
        }
    }
}

pub struct YouTubeTranscriptService {
    client: reqwest::Client,
}

impl YouTubeTranscriptService {
    pub fn new(timeout: Duration) -> Result<Self, SubtitleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TranscriptService for YouTubeTranscriptService {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, SubtitleError> {
        let html = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id.as_str())])
            .header(reqwest::header::ACCEPT_LANGUAGE, "ko,en;q=0.8")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let tracks = parse_caption_tracks(&html)?;
        debug!("📋 {} caption track(s) listed for {}", tracks.len(), video_id);
        Ok(tracks)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<String, SubtitleError> {
        trace!("🔍 Fetching caption track lang={} generated={}", track.language_code, track.is_generated);
        let xml = self
            .client
            .get(&track.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_timedtext(&xml))
    }
}

type CachedListing = (Instant, Result<Vec<CaptionTrack>, String>);

/// Remembers each video's caption listing for a short while, so the
/// strategies in one retrieval share a single watch-page download.
pub struct CachedTranscriptService {
    inner: Arc<dyn TranscriptService>,
    ttl: Duration,
    listings: Mutex<HashMap<VideoId, CachedListing>>,
}

impl CachedTranscriptService {
    pub fn new(inner: Arc<dyn TranscriptService>) -> Self {
        Self::with_ttl(inner, LISTING_CACHE_TTL)
    }

    pub fn with_ttl(inner: Arc<dyn TranscriptService>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            listings: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, video_id: &VideoId) -> Option<Result<Vec<CaptionTrack>, String>> {
        let listings = self.listings.lock().ok()?;
        listings
            .get(video_id)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, listing)| listing.clone())
    }

    fn store(&self, video_id: &VideoId, listing: Result<Vec<CaptionTrack>, String>) {
        if let Ok(mut listings) = self.listings.lock() {
            let ttl = self.ttl;
            listings.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
            listings.insert(video_id.clone(), (Instant::now(), listing));
        }
    }
}

#[async_trait]
impl TranscriptService for CachedTranscriptService {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, SubtitleError> {
        if let Some(listing) = self.cached(video_id) {
            trace!("🔍 Reusing caption listing for {}", video_id);
            return listing.map_err(SubtitleError::ListingFailed);
        }

        let listing = self.inner.list_tracks(video_id).await;
        match &listing {
            Ok(tracks) => self.store(video_id, Ok(tracks.clone())),
            Err(e) => self.store(video_id, Err(e.to_string())),
        }
        listing
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<String, SubtitleError> {
        self.inner.fetch_track(track).await
    }
}

/// Reads the caption track list out of a watch page.
pub fn parse_caption_tracks(html: &str) -> Result<Vec<CaptionTrack>, SubtitleError> {
    let marker = html
        .find(PLAYER_RESPONSE_MARKER)
        .ok_or_else(|| SubtitleError::PlayerResponse("player response not found in page".to_string()))?;
    let after_marker = &html[marker..];
    let json_start = after_marker
        .find('{')
        .ok_or_else(|| SubtitleError::PlayerResponse("player response has no JSON body".to_string()))?;

    // The object is followed by more script, so read exactly one JSON value.
    let player: PlayerResponse = serde_json::Deserializer::from_str(&after_marker[json_start..])
        .into_iter::<PlayerResponse>()
        .next()
        .ok_or_else(|| SubtitleError::PlayerResponse("empty player response".to_string()))??;

    let tracks: Vec<CaptionTrack> = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default()
        .into_iter()
        .map(CaptionTrack::from)
        .collect();

    if tracks.is_empty() {
        return Err(SubtitleError::NoTranscripts);
    }
    Ok(tracks)
}

/// Flattens a timedtext XML document into one line of plain text.
pub fn parse_timedtext(xml: &str) -> String {
    TIMEDTEXT_REGEX
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_html_entities(&INNER_TAG_REGEX.replace_all(m.as_str(), "")))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_html_entities(text: &str) -> String {
    let mut result = text.to_string();

    // &amp; first so double-escaped entities like &amp;#39; resolve fully
    let entities = [
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&nbsp;", " "),
    ];
    for (entity, replacement) in entities.iter() {
        result = result.replace(entity, replacement);
    }

    NUMERIC_ENTITY_REGEX
        .replace_all(&result, |caps: &regex::Captures| {
            let code = &caps[1];
            let value = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            value
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Picks the best track for the preferred languages: creator-uploaded before
/// auto-generated within a language, languages in preference order.
pub fn select_preferred_track<'a>(tracks: &'a [CaptionTrack], languages: &[&str]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        let in_language: Vec<&CaptionTrack> = tracks
            .iter()
            .filter(|t| t.language_code.eq_ignore_ascii_case(lang))
            .collect();
        in_language
            .iter()
            .find(|t| !t.is_generated)
            .or_else(|| in_language.first())
            .copied()
    })
}

/// Strategy 1: a transcript in one of the preferred languages.
pub struct PreferredLanguageTranscript {
    service: Arc<dyn TranscriptService>,
}

impl PreferredLanguageTranscript {
    pub fn new(service: Arc<dyn TranscriptService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SubtitleStrategy for PreferredLanguageTranscript {
    fn name(&self) -> &'static str {
        "preferred-language transcript"
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, SubtitleError> {
        let tracks = self.service.list_tracks(video_id).await?;
        let track = select_preferred_track(&tracks, &PREFERRED_LANGUAGES)
            .ok_or_else(|| SubtitleError::LanguageUnavailable(PREFERRED_LANGUAGES.join(", ")))?;
        self.service.fetch_track(track).await
    }
}

/// Strategy 2: whatever transcript is listed first, in any language.
pub struct AnyLanguageTranscript {
    service: Arc<dyn TranscriptService>,
}

impl AnyLanguageTranscript {
    pub fn new(service: Arc<dyn TranscriptService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SubtitleStrategy for AnyLanguageTranscript {
    fn name(&self) -> &'static str {
        "first listed transcript"
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, SubtitleError> {
        let tracks = self.service.list_tracks(video_id).await?;
        let track = tracks.first().ok_or(SubtitleError::NoTranscripts)?;
        self.service.fetch_track(track).await
    }
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    title: String,
}

pub struct OEmbedTitleLookup {
    client: reqwest::Client,
}

impl OEmbedTitleLookup {
    pub fn new() -> Result<Self, SubtitleError> {
        let client = reqwest::Client::builder()
            .timeout(TITLE_LOOKUP_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl VideoTitleLookup for OEmbedTitleLookup {
    async fn title(&self, video_url: &str) -> Result<String, SubtitleError> {
        let response: OEmbedResponse = self
            .client
            .get(OEMBED_URL)
            .query(&[("url", video_url), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.title.trim().to_string())
    }
}
