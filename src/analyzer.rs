// analyzer.rs - Request Dispatch and Response Composition
// One inbound chat message in, one plain-text reply out. The message is
// checked for a URL, routed to the article or subtitle path, validated for
// length, wrapped in the profile's instructions and sent to the generator once.
// Every failure is rendered as a short warning string; callers never see an
// error value.

use crate::article::extract_article;
use crate::classify::{classify, is_url, strip_command_keyword, SourceKind};
use crate::config::{GenerationBackend, ServerConfig};
use crate::content::ExtractedContent;
use crate::fetch::{FetchError, HttpFetcher, PageFetcher};
use crate::generation::{GeminiGenerator, GenerationError, OpenAiCompatGenerator, TextGenerator};
use crate::profile::AnalysisProfile;
use crate::subtitles::{OEmbedTitleLookup, SubtitleRetriever, YouTubeTranscriptService, YtDlpSubtitles};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

pub const MSG_NOT_A_URL: &str = "⚠️ 올바른 URL을 입력해주세요.\n사용법: 분석 https://뉴스URL";
pub const MSG_TIMEOUT: &str = "⚠️ 요청 시간이 초과되었습니다. 다시 시도해주세요.";
pub const MSG_ARTICLE_TOO_SHORT: &str = "⚠️ 기사 본문을 가져올 수 없습니다. URL을 확인해주세요.";
pub const MSG_VIDEO_TOO_SHORT: &str = "⚠️ 영상 자막 내용이 너무 짧아 분석할 수 없습니다.";
pub const MSG_NO_CAPTIONS: &str = "⚠️ 이 영상의 자막을 가져올 수 없습니다. 자막이 있는 영상인지 확인해주세요.";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("input is not a URL")]
    NotAUrl,
    #[error("page fetch timed out")]
    FetchTimeout,
    #[error("page fetch failed: {0}")]
    Fetch(String),
    #[error("not enough {0:?} content to analyze")]
    InsufficientContent(SourceKind),
    #[error("no captions available for this video")]
    NoCaptionsAvailable,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl From<FetchError> for AnalyzeError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout => AnalyzeError::FetchTimeout,
            FetchError::Request(message) => AnalyzeError::Fetch(message),
        }
    }
}

impl AnalyzeError {
    /// The chat-facing text for this failure.
    pub fn user_message(&self) -> String {
        match self {
            AnalyzeError::NotAUrl => MSG_NOT_A_URL.to_string(),
            AnalyzeError::FetchTimeout | AnalyzeError::Generation(GenerationError::Timeout) => {
                MSG_TIMEOUT.to_string()
            }
            AnalyzeError::Fetch(message) => format!("⚠️ URL 접속 오류: {}", message),
            AnalyzeError::InsufficientContent(SourceKind::Article) => MSG_ARTICLE_TOO_SHORT.to_string(),
            AnalyzeError::InsufficientContent(SourceKind::Video) => MSG_VIDEO_TOO_SHORT.to_string(),
            AnalyzeError::NoCaptionsAvailable => MSG_NO_CAPTIONS.to_string(),
            AnalyzeError::Generation(e) => format!("⚠️ 분석 오류: {}", e),
        }
    }
}

/// Validates the extracted content and wraps it in the profile's instructions.
pub fn compose_prompt(profile: &AnalysisProfile, content: &ExtractedContent) -> Result<String, AnalyzeError> {
    if content.source_kind == SourceKind::Video && content.body.trim().is_empty() {
        return Err(AnalyzeError::NoCaptionsAvailable);
    }
    if !content.has_enough_body() {
        return Err(AnalyzeError::InsufficientContent(content.source_kind));
    }

    let label = match content.source_kind {
        SourceKind::Article => &profile.article_label,
        SourceKind::Video => &profile.video_label,
    };

    let mut prompt = format!("{}\n\n---\n", profile.instructions);
    if !content.title.trim().is_empty() {
        prompt.push_str(&format!("{} 제목: {}\n", label, content.title.trim()));
    }
    prompt.push_str(&format!("{} 본문:\n{}", label, content.body));
    Ok(prompt)
}

pub struct Analyzer {
    fetcher: Arc<dyn PageFetcher>,
    subtitles: SubtitleRetriever,
    generator: Arc<dyn TextGenerator>,
    profile: AnalysisProfile,
}

impl Analyzer {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        subtitles: SubtitleRetriever,
        generator: Arc<dyn TextGenerator>,
        profile: AnalysisProfile,
    ) -> Self {
        Self {
            fetcher,
            subtitles,
            generator,
            profile,
        }
    }

    /// Wires the production HTTP clients, subtitle chain and generator.
    pub fn from_config(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout)?);
        let subtitles = SubtitleRetriever::youtube(
            Arc::new(YouTubeTranscriptService::new(config.fetch_timeout)?),
            YtDlpSubtitles::new(&config.ytdlp_command, config.scratch_dir.clone()),
            OEmbedTitleLookup::new()?,
        );

        let generator: Arc<dyn TextGenerator> = match &config.backend {
            GenerationBackend::Gemini => Arc::new(GeminiGenerator::new(
                config.gemini_api_key.clone(),
                config.generation_timeout,
            )?),
            GenerationBackend::OpenAiCompat { base_url, api_key } => Arc::new(OpenAiCompatGenerator::new(
                base_url.clone(),
                api_key.clone(),
                config.generation_timeout,
            )?),
        };

        Ok(Self::new(fetcher, subtitles, generator, config.profile.clone()))
    }

    pub fn profile(&self) -> &AnalysisProfile {
        &self.profile
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Handles one chat message. Always returns text for the chat room.
    pub async fn analyze(&self, text: &str) -> String {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        info!("📨 [{}] Analyze request: '{}'", request_id, text.trim());

        match self.try_analyze(text, request_id).await {
            Ok(reply) => {
                info!(
                    "✅ [{}] Analysis completed in {:.2}s ({} chars)",
                    request_id,
                    started.elapsed().as_secs_f32(),
                    reply.chars().count()
                );
                reply
            }
            Err(e) => {
                match &e {
                    AnalyzeError::Generation(_) | AnalyzeError::Fetch(_) | AnalyzeError::FetchTimeout => {
                        error!("❌ [{}] Analysis failed: {}", request_id, e)
                    }
                    _ => warn!("⚠️ [{}] Analysis rejected: {}", request_id, e),
                }
                e.user_message()
            }
        }
    }

    pub async fn try_analyze(&self, text: &str, request_id: Uuid) -> Result<String, AnalyzeError> {
        let url = strip_command_keyword(text);
        if !is_url(url) {
            return Err(AnalyzeError::NotAUrl);
        }

        let content = self.extract(url).await?;
        debug!(
            "📄 [{}] Extracted {:?} content: title='{}', body={} chars",
            request_id,
            content.source_kind,
            content.title,
            content.body_chars()
        );

        let prompt = compose_prompt(&self.profile, &content)?;
        debug!(
            "🤖 [{}] Generating with model {} ({} prompt chars)",
            request_id,
            self.profile.model,
            prompt.chars().count()
        );
        Ok(self.generator.generate(&prompt, &self.profile.model).await?)
    }

    /// Routes the URL to the article or subtitle path.
    pub async fn extract(&self, url: &str) -> Result<ExtractedContent, AnalyzeError> {
        match classify(url) {
            SourceKind::Video => Ok(self.subtitles.retrieve(url).await),
            SourceKind::Article => {
                let html = self.fetcher.fetch(url).await?;
                Ok(extract_article(&html))
            }
        }
    }
}
