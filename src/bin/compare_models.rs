// compare_models.rs - Side-by-side model comparison
// Extracts one URL once, then runs the same composed prompt through each
// model and prints latency and output. Usage:
//   compare_models [url] [model ...]

use news_digest_bot::analyzer::compose_prompt;
use news_digest_bot::config::{load_settings, ServerConfig};
use news_digest_bot::Analyzer;
use std::env;
use std::process;
use std::time::{Duration, Instant};

const DEFAULT_URL: &str = "https://n.news.naver.com/article/374/0000427055";
const DEFAULT_MODELS: [&str; 2] = ["gemini-2.0-flash", "gemini-3.0-flash"];
const PAUSE_BETWEEN_MODELS: Duration = Duration::from_secs(3);

fn rule() -> String {
    "=".repeat(60)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .init();

    let mut args = env::args().skip(1);
    let url = args.next().unwrap_or_else(|| DEFAULT_URL.to_string());
    let mut models: Vec<String> = args.collect();
    if models.is_empty() {
        models = DEFAULT_MODELS.iter().map(|m| m.to_string()).collect();
    }

    let (_, mut settings) = load_settings();
    settings
        .entry("ANALYSIS_PROFILE".to_string())
        .or_insert_with(|| "brief".to_string());

    let analyzer = match ServerConfig::from_settings(&settings)
        .map_err(|e| e.to_string())
        .and_then(|config| Analyzer::from_config(&config).map_err(|e| e.to_string()))
    {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };

    println!("{}", rule());
    println!("테스트 URL: {}", url);
    println!("{}", rule());
    println!("\n본문 추출 중...");

    let prompt = match analyzer
        .extract(&url)
        .await
        .and_then(|content| {
            println!("추출 완료 ({}자)\n", content.body_chars());
            compose_prompt(analyzer.profile(), &content)
        }) {
        Ok(prompt) => prompt,
        Err(e) => {
            eprintln!("{}", e.user_message());
            process::exit(1);
        }
    };

    for (i, model) in models.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(PAUSE_BETWEEN_MODELS).await;
        }
        println!("{}", rule());
        println!("🔥 모델: {}", model);
        println!("{}", rule());

        let started = Instant::now();
        match analyzer.generator().generate(&prompt, model).await {
            Ok(text) => {
                println!("⏱️ 응답 시간: {:.1}초", started.elapsed().as_secs_f32());
                println!("{}", "-".repeat(40));
                println!("{}", text);
            }
            Err(e) => println!("❌ 오류: {}", e),
        }
        println!();
    }
}
