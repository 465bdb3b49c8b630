// fetch.rs - Page Fetcher
// Single-attempt HTTP GET with a desktop browser identity. The body charset is
// sniffed from the bytes instead of trusting the Content-Type header, since a
// lot of Korean news sites still serve EUC-KR pages labelled as UTF-8 (or the
// other way round).

use async_trait::async_trait;
use log::{debug, trace, warn};
use std::time::Duration;
use thiserror::Error;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// Anything that can turn a URL into decoded markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("🌐 Fetching page: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            // Error pages still go through extraction; the length check rejects them.
            warn!("⚠️ Non-success status {} from {}", status, url);
        }

        let bytes = response.bytes().await?;
        let html = decode_body(&bytes);
        debug!("📄 Downloaded {} bytes ({} chars decoded) from {}", bytes.len(), html.chars().count(), url);
        Ok(html)
    }
}

/// Decode a response body, guessing the encoding from its content.
pub fn decode_body(bytes: &[u8]) -> String {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    trace!("🔍 Detected body encoding: {}", encoding.name());

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("⚠️ Body contained bytes invalid for {}", encoding.name());
    }
    text.into_owned()
}
