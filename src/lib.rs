pub mod analyzer;
pub mod article;
pub mod classify;
pub mod config;
pub mod content;
pub mod fetch;
pub mod generation;
pub mod profile;
pub mod server;
pub mod subtitles;

pub use analyzer::{AnalyzeError, Analyzer};
pub use config::ServerConfig;
pub use server::create_app;
