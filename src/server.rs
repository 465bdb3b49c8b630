// server.rs - HTTP Endpoints
// The chatbot relay posts each message to /analyze and forwards whatever
// text comes back. Analysis failures are already rendered as chat text, so
// /analyze answers 200 for any well-formed request.

use crate::analyzer::Analyzer;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub const SERVICE_MESSAGE: &str = "뉴스 분석 봇 서버 작동 중";

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub response: String,
}

pub fn create_app(analyzer: Arc<Analyzer>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .with_state(analyzer)
}

async fn root_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "message": SERVICE_MESSAGE }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn analyze_handler(
    State(analyzer): State<Arc<Analyzer>>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<AnalyzeResponse> {
    debug!("📥 /analyze received {} chars", request.text.chars().count());
    let response = analyzer.analyze(&request.text).await;
    Json(AnalyzeResponse { response })
}
