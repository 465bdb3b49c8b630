// generation.rs - Text Generation Backends
// The generation step is opaque to the rest of the crate: a prompt and a model
// name go in, formatted text comes out. Two HTTP backends are provided:
// Google's Gemini `generateContent` and any OpenAI-compatible chat endpoint
// (LM Studio, Ollama, vLLM).

use async_trait::async_trait;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// Reasoning models served through OpenAI-compatible servers inline their thoughts
static THINKING_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("Invalid thinking tag regex pattern")
});

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request timed out")]
    Timeout,
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("generation API returned no text")]
    EmptyResponse,
}

// The request URL is dropped so endpoint details never reach chat replies.
impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Request(e.without_url().to_string())
        }
    }
}

/// Given a prompt, produce formatted text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError>;
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, GenerationError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(30))
        .build()?)
}

async fn read_success_body(response: reqwest::Response) -> Result<String, GenerationError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(GenerationError::Api {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        });
    }
    Ok(body)
}

// ============================================================================
// GEMINI
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        let api_url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        debug!("🤖 Gemini request: model={}, prompt={} chars", model, prompt.chars().count());

        let response = self
            .client
            .post(&api_url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;

        let body = read_success_body(response).await?;
        parse_gemini_response(&body)
    }
}

pub fn parse_gemini_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Request(format!("unreadable Gemini response: {}", e)))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    trace!("🔍 Gemini returned {} chars", text.chars().count());
    Ok(text)
}

// ============================================================================
// OPENAI-COMPATIBLE
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiCompatGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatGenerator {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        let api_url = format!("{}/v1/chat/completions", self.base_url);
        debug!("🤖 Chat completion request to {}: model={}", api_url, model);

        let chat_request = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false
        });

        let mut request = self.client.post(&api_url).json(&chat_request);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body = read_success_body(request.send().await?).await?;
        parse_chat_completion(&body)
    }
}

pub fn parse_chat_completion(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Request(format!("unreadable chat completion: {}", e)))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    let cleaned = THINKING_TAG_REGEX.replace_all(&content, "").trim().to_string();
    if cleaned.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(cleaned)
}
