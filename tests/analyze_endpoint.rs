use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use news_digest_bot::analyzer::{MSG_NOT_A_URL, MSG_TIMEOUT};
use news_digest_bot::classify::VideoId;
use news_digest_bot::fetch::{FetchError, PageFetcher};
use news_digest_bot::generation::{GenerationError, TextGenerator};
use news_digest_bot::profile::AnalysisProfile;
use news_digest_bot::subtitles::{SubtitleError, SubtitleRetriever, SubtitleStrategy, VideoTitleLookup};
use news_digest_bot::{create_app, Analyzer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

struct StubFetcher {
    result: fn() -> Result<String, FetchError>,
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.result)()
    }
}

struct StubGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str, _model: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("OK".to_string())
    }
}

struct NoTranscript;

#[async_trait]
impl SubtitleStrategy for NoTranscript {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn fetch(&self, _video_id: &VideoId) -> Result<String, SubtitleError> {
        Err(SubtitleError::NoTranscripts)
    }
}

struct NoTitle;

#[async_trait]
impl VideoTitleLookup for NoTitle {
    async fn title(&self, _video_url: &str) -> Result<String, SubtitleError> {
        Ok(String::new())
    }
}

fn korean_article() -> Result<String, FetchError> {
    Ok("<html><body><nav>메뉴</nav><article>정부가 내년도 예산안을 발표했습니다. 반도체와 이차전지 산업에 대한 지원이 크게 늘어났고 연구개발 예산도 확대되었습니다.</article></body></html>".to_string())
}

struct TestApp {
    app: axum::Router,
    fetcher: Arc<StubFetcher>,
    generator: Arc<StubGenerator>,
}

fn test_app(fetch: fn() -> Result<String, FetchError>) -> TestApp {
    let fetcher = Arc::new(StubFetcher {
        result: fetch,
        calls: AtomicUsize::new(0),
    });
    let generator = Arc::new(StubGenerator {
        calls: AtomicUsize::new(0),
    });
    let analyzer = Analyzer::new(
        fetcher.clone(),
        SubtitleRetriever::new(vec![Box::new(NoTranscript)], Box::new(NoTitle)),
        generator.clone(),
        AnalysisProfile::builtin("investor").unwrap(),
    );
    TestApp {
        app: create_app(Arc::new(analyzer)),
        fetcher,
        generator,
    }
}

async fn post_analyze(app: axum::Router, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn analyze_article_end_to_end() {
    let t = test_app(korean_article);
    let (status, body) = post_analyze(t.app, json!({ "text": "https://example.com/a" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "response": "OK" }));
    assert_eq!(t.fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(t.generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn analyze_accepts_command_keyword() {
    let t = test_app(korean_article);
    let (_, body) = post_analyze(t.app, json!({ "text": "분석 https://example.com/a" })).await;
    assert_eq!(body["response"], "OK");
}

#[tokio::test]
async fn analyze_non_url_returns_guidance_without_network() {
    let t = test_app(korean_article);
    let (status, body) = post_analyze(t.app, json!({ "text": "hello" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], MSG_NOT_A_URL);
    assert_eq!(t.fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(t.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn analyze_fetch_timeout_is_still_200() {
    let t = test_app(|| Err(FetchError::Timeout));
    let (status, body) = post_analyze(t.app, json!({ "text": "https://example.com/slow" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], MSG_TIMEOUT);
    assert_eq!(t.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn analyze_video_without_captions() {
    let t = test_app(korean_article);
    let (status, body) = post_analyze(t.app, json!({ "text": "https://youtu.be/dQw4w9WgXcQ" })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].as_str().unwrap().contains("자막을 가져올 수 없습니다"));
    assert_eq!(t.fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(t.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn health_and_root() {
    let t = test_app(korean_article);
    let (status, body) = get_json(t.app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = get_json(t.app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "message": "뉴스 분석 봇 서버 작동 중" }));
}
