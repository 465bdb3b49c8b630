// subtitles/mod.rs - Video Subtitle Retrieval
// Turns a video URL into (title, transcript). Transcript strategies are tried
// strictly in order and the first non-empty text wins; a failing strategy is
// logged and the chain moves on. The title comes from a separate best-effort
// metadata lookup and is allowed to be empty.

pub mod youtube;
pub mod ytdlp;

use crate::classify::{extract_video_id, SourceKind, VideoId};
use crate::content::{truncate_chars, ExtractedContent, MAX_BODY_CHARS};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use thiserror::Error;

pub use youtube::{
    AnyLanguageTranscript, CachedTranscriptService, CaptionTrack, OEmbedTitleLookup,
    PreferredLanguageTranscript, TranscriptService, YouTubeTranscriptService,
};
pub use ytdlp::YtDlpSubtitles;

/// Language preference for every strategy: Korean first, English second.
pub const PREFERRED_LANGUAGES: [&str; 2] = ["ko", "en"];

#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("no transcripts listed for this video")]
    NoTranscripts,
    #[error("no transcript in any of: {0}")]
    LanguageUnavailable(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("could not read player response: {0}")]
    PlayerResponse(String),
    #[error("caption listing failed earlier: {0}")]
    ListingFailed(String),
    #[error("subtitle downloader failed: {0}")]
    Downloader(String),
    #[error("subtitle downloader timed out after {0}s")]
    DownloaderTimeout(u64),
    #[error("subtitle downloader produced no subtitle file")]
    SubtitleFileMissing,
    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed subtitle data: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SubtitleError {
    fn from(e: reqwest::Error) -> Self {
        SubtitleError::Http(e.to_string())
    }
}

/// One way of getting a transcript for a video.
#[async_trait]
pub trait SubtitleStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, video_id: &VideoId) -> Result<String, SubtitleError>;
}

/// Best-effort title lookup for a video URL.
#[async_trait]
pub trait VideoTitleLookup: Send + Sync {
    async fn title(&self, video_url: &str) -> Result<String, SubtitleError>;
}

pub struct SubtitleRetriever {
    strategies: Vec<Box<dyn SubtitleStrategy>>,
    title_lookup: Box<dyn VideoTitleLookup>,
}

impl SubtitleRetriever {
    pub fn new(
        strategies: Vec<Box<dyn SubtitleStrategy>>,
        title_lookup: Box<dyn VideoTitleLookup>,
    ) -> Self {
        Self {
            strategies,
            title_lookup,
        }
    }

    /// The standard chain: caption tracks by language, any caption track, then yt-dlp.
    /// Both caption strategies share one cached listing per video.
    pub fn youtube(
        service: Arc<dyn TranscriptService>,
        downloader: YtDlpSubtitles,
        title_lookup: OEmbedTitleLookup,
    ) -> Self {
        let service: Arc<dyn TranscriptService> = Arc::new(CachedTranscriptService::new(service));
        Self::new(
            vec![
                Box::new(PreferredLanguageTranscript::new(service.clone())),
                Box::new(AnyLanguageTranscript::new(service)),
                Box::new(downloader),
            ],
            Box::new(title_lookup),
        )
    }

    pub async fn retrieve(&self, video_url: &str) -> ExtractedContent {
        let Some(video_id) = extract_video_id(video_url) else {
            info!("🎥 No video id in {}, skipping subtitle lookup", video_url);
            return ExtractedContent::empty(SourceKind::Video);
        };
        info!("🎥 Retrieving subtitles for video {}", video_id);

        let title = match self.title_lookup.title(video_url).await {
            Ok(title) => title,
            Err(e) => {
                debug!("⚠️ Video title lookup failed for {}: {}", video_id, e);
                String::new()
            }
        };

        let body = self.first_transcript(&video_id).await.unwrap_or_default();

        ExtractedContent {
            title,
            body: truncate_chars(&body, MAX_BODY_CHARS),
            source_kind: SourceKind::Video,
        }
    }

    async fn first_transcript(&self, video_id: &VideoId) -> Option<String> {
        for strategy in &self.strategies {
            match strategy.fetch(video_id).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        "✅ Transcript for {} from '{}' ({} chars)",
                        video_id,
                        strategy.name(),
                        text.chars().count()
                    );
                    return Some(text);
                }
                Ok(_) => debug!("📭 '{}' returned an empty transcript for {}", strategy.name(), video_id),
                Err(e) => warn!("⚠️ '{}' failed for {}: {}", strategy.name(), video_id, e),
            }
        }
        warn!("❌ All subtitle strategies exhausted for {}", video_id);
        None
    }
}
