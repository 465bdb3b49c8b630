// config.rs - Server Configuration
// KEY=VALUE settings from newsbotconfig.txt (searched in the usual places),
// overridden by process environment variables of the same name. The file is
// optional; a bare `GEMINI_API_KEY=... news_digest_bot` is enough to run.

use crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::profile::{load_prompt_override, AnalysisProfile, DEFAULT_PROFILE, PROFILE_NAMES};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "newsbotconfig.txt";

pub const CONFIG_KEYS: [&str; 12] = [
    "GEMINI_API_KEY",
    "BIND_ADDR",
    "ANALYSIS_PROFILE",
    "MODEL",
    "GENERATION_BACKEND",
    "LM_BASE_URL",
    "LM_API_KEY",
    "GENERATION_TIMEOUT",
    "FETCH_TIMEOUT",
    "SCRATCH_DIR",
    "YTDLP_PATH",
    "RUST_LOG",
];

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a whole number of seconds between 1 and 600 (got '{value}')")]
    InvalidTimeout { key: &'static str, value: String },
    #[error("unknown ANALYSIS_PROFILE '{0}' (expected one of: {1})")]
    UnknownProfile(String, String),
    #[error("unknown GENERATION_BACKEND '{0}' (expected 'gemini' or 'openai')")]
    UnknownBackend(String),
    #[error("LM_BASE_URL must be set to an http:// or https:// URL when GENERATION_BACKEND=openai")]
    MissingLmBaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationBackend {
    Gemini,
    OpenAiCompat { base_url: String, api_key: Option<String> },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub gemini_api_key: String,
    pub profile: AnalysisProfile,
    pub backend: GenerationBackend,
    pub generation_timeout: Duration,
    pub fetch_timeout: Duration,
    pub scratch_dir: PathBuf,
    pub ytdlp_command: String,
    pub log_filter: Option<String>,
}

/// Parses KEY=VALUE lines, skipping blanks and `#` comments.
pub fn parse_config_text(content: &str) -> HashMap<String, String> {
    // Remove BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(equals_pos) = line.find('=') {
            let key = line[..equals_pos].trim().to_string();
            let value = line[equals_pos + 1..].trim().to_string();
            config.insert(key, value);
        }
    }
    config
}

/// Reads the first config file found, returning the path it came from.
pub fn load_config_file() -> Option<(String, HashMap<String, String>)> {
    let config_paths = [
        CONFIG_FILE_NAME.to_string(),
        format!("../{}", CONFIG_FILE_NAME),
        format!("../../{}", CONFIG_FILE_NAME),
        format!("src/{}", CONFIG_FILE_NAME),
    ];

    config_paths.iter().find_map(|path| {
        fs::read_to_string(path)
            .ok()
            .map(|content| (path.clone(), parse_config_text(&content)))
    })
}

/// File values with environment variables layered on top.
pub fn load_settings() -> (Option<String>, HashMap<String, String>) {
    let (source, mut settings) = match load_config_file() {
        Some((path, settings)) => (Some(path), settings),
        None => (None, HashMap::new()),
    };

    for key in CONFIG_KEYS {
        if let Ok(value) = env::var(key) {
            settings.insert(key.to_string(), value);
        }
    }
    (source, settings)
}

fn setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn timeout_setting(
    settings: &HashMap<String, String>,
    key: &'static str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    match setting(settings, key) {
        None => Ok(Duration::from_secs(default_secs)),
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if (1..=600).contains(&secs) => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidTimeout {
                key,
                value: value.to_string(),
            }),
        },
    }
}

impl ServerConfig {
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let profile_name = setting(settings, "ANALYSIS_PROFILE").unwrap_or(DEFAULT_PROFILE);
        let mut profile = AnalysisProfile::builtin(profile_name).ok_or_else(|| {
            ConfigError::UnknownProfile(profile_name.to_string(), PROFILE_NAMES.join(", "))
        })?;
        if let Some(instructions) = load_prompt_override(&profile.name) {
            profile = profile.with_instructions(instructions);
        }
        if let Some(model) = setting(settings, "MODEL") {
            profile = profile.with_model(model);
        }

        let backend = match setting(settings, "GENERATION_BACKEND")
            .unwrap_or("gemini")
            .to_ascii_lowercase()
            .as_str()
        {
            "gemini" => GenerationBackend::Gemini,
            "openai" => {
                let base_url = setting(settings, "LM_BASE_URL")
                    .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
                    .ok_or(ConfigError::MissingLmBaseUrl)?;
                GenerationBackend::OpenAiCompat {
                    base_url: base_url.to_string(),
                    api_key: setting(settings, "LM_API_KEY").map(str::to_string),
                }
            }
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        Ok(Self {
            bind_addr: setting(settings, "BIND_ADDR")
                .unwrap_or(DEFAULT_BIND_ADDR)
                .to_string(),
            gemini_api_key: setting(settings, "GEMINI_API_KEY").unwrap_or_default().to_string(),
            profile,
            backend,
            generation_timeout: timeout_setting(settings, "GENERATION_TIMEOUT", DEFAULT_GENERATION_TIMEOUT_SECS)?,
            fetch_timeout: timeout_setting(settings, "FETCH_TIMEOUT", DEFAULT_FETCH_TIMEOUT_SECS)?,
            scratch_dir: setting(settings, "SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            ytdlp_command: setting(settings, "YTDLP_PATH").unwrap_or("yt-dlp").to_string(),
            log_filter: setting(settings, "RUST_LOG").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_config_text() {
        let content = "\u{feff}# news bot\nGEMINI_API_KEY = abc=def\n\nBIND_ADDR=127.0.0.1:9000\nnot a setting\n";
        let parsed = parse_config_text(content);
        assert_eq!(parsed.get("GEMINI_API_KEY").map(String::as_str), Some("abc=def"));
        assert_eq!(parsed.get("BIND_ADDR").map(String::as_str), Some("127.0.0.1:9000"));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_settings(&HashMap::new()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.gemini_api_key, "");
        assert_eq!(config.profile.name, "investor");
        assert_eq!(config.profile.model, "gemini-2.5-flash");
        assert_eq!(config.backend, GenerationBackend::Gemini);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.generation_timeout, Duration::from_secs(120));
        assert_eq!(config.scratch_dir, env::temp_dir());
        assert_eq!(config.ytdlp_command, "yt-dlp");
        assert_eq!(config.log_filter, None);
    }

    #[test]
    fn test_profile_and_model_override() {
        let config = ServerConfig::from_settings(&settings(&[
            ("ANALYSIS_PROFILE", "brief"),
            ("MODEL", "gemini-3.0-flash"),
        ]))
        .unwrap();
        assert_eq!(config.profile.name, "brief");
        assert_eq!(config.profile.model, "gemini-3.0-flash");
    }

    #[test]
    fn test_openai_backend_requires_base_url() {
        let err = ServerConfig::from_settings(&settings(&[("GENERATION_BACKEND", "openai")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingLmBaseUrl));

        let config = ServerConfig::from_settings(&settings(&[
            ("GENERATION_BACKEND", "OpenAI"),
            ("LM_BASE_URL", "http://localhost:1234"),
        ]))
        .unwrap();
        assert_eq!(
            config.backend,
            GenerationBackend::OpenAiCompat {
                base_url: "http://localhost:1234".to_string(),
                api_key: None,
            }
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServerConfig::from_settings(&settings(&[("ANALYSIS_PROFILE", "poet")])),
            Err(ConfigError::UnknownProfile(_, _))
        ));
        assert!(matches!(
            ServerConfig::from_settings(&settings(&[("GENERATION_BACKEND", "bard")])),
            Err(ConfigError::UnknownBackend(_))
        ));
        assert!(matches!(
            ServerConfig::from_settings(&settings(&[("FETCH_TIMEOUT", "0")])),
            Err(ConfigError::InvalidTimeout { key: "FETCH_TIMEOUT", .. })
        ));
        assert!(matches!(
            ServerConfig::from_settings(&settings(&[("GENERATION_TIMEOUT", "soon")])),
            Err(ConfigError::InvalidTimeout { key: "GENERATION_TIMEOUT", .. })
        ));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = ServerConfig::from_settings(&settings(&[("BIND_ADDR", "  "), ("YTDLP_PATH", "")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.ytdlp_command, "yt-dlp");
    }
}
