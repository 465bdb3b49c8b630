use news_digest_bot::config::{load_settings, GenerationBackend, ServerConfig};
use news_digest_bot::{create_app, Analyzer};
use std::process;
use std::sync::Arc;
use tokio::signal;
use uuid::Uuid;

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => log::info!("📡 Received Ctrl+C, stopping server gracefully..."),
        Err(e) => log::error!("❌ Failed to listen for Ctrl+C: {}", e),
    }
}

#[tokio::main]
async fn main() {
    let (config_source, settings) = load_settings();

    // Initialize logger - must be done before any logging calls
    let default_filter = settings
        .get("RUST_LOG")
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();

    let instance_id = Uuid::new_v4();
    log::info!("🚀 News digest bot starting up (instance {})", instance_id);
    match &config_source {
        Some(path) => log::info!("✅ Configuration loaded from {}", path),
        None => log::info!("📄 No newsbotconfig.txt found, using environment and defaults"),
    }

    let config = match ServerConfig::from_settings(&settings) {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            eprintln!("❌ Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    if config.backend == GenerationBackend::Gemini && config.gemini_api_key.is_empty() {
        log::warn!("⚠️ GEMINI_API_KEY is not set; every analysis will fail at generation");
    }
    let backend = match &config.backend {
        GenerationBackend::Gemini => "Gemini".to_string(),
        GenerationBackend::OpenAiCompat { base_url, .. } => format!("OpenAI-compatible at {}", base_url),
    };
    log::info!(
        "🤖 Profile '{}' using model {} via {}",
        config.profile.name,
        config.profile.model,
        backend
    );

    let analyzer = match Analyzer::from_config(&config) {
        Ok(analyzer) => Arc::new(analyzer),
        Err(e) => {
            log::error!("❌ Failed to build analyzer: {}", e);
            eprintln!("❌ Failed to build analyzer: {}", e);
            process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("❌ Could not bind {}: {}", config.bind_addr, e);
            eprintln!("❌ Could not bind {}: {}", config.bind_addr, e);
            process::exit(1);
        }
    };

    log::info!("🌐 Listening on http://{}", config.bind_addr);
    log::info!("💡 Press Ctrl+C to stop");

    if let Err(e) = axum::serve(listener, create_app(analyzer))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        log::error!("❌ Server error: {}", e);
    }

    log::info!("👋 Server shutdown complete");
}
