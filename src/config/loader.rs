use std::{env, time::Duration};

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, ExtractorConfig, GeminiConfig, LoggingConfig,
    RetryConfig,
};

pub const DEFAULT_MODELS: [&str; 3] = ["gemini-2.5-flash", "gemini-2.0-flash-lite", "gemini-2.0-flash"];
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let models = env::var("GEMINI_MODELS")
            .map(|value| parse_list(&value))
            .ok()
            .filter(|models| !models.is_empty())
            .unwrap_or_else(|| DEFAULT_MODELS.iter().map(|m| m.to_string()).collect());

        let gemini = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()),
            api_base: env::var("GEMINI_API_BASE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            models,
            request_timeout: parse_millis("GEMINI_REQUEST_TIMEOUT", 60_000),
        };

        let retry_defaults = RetryConfig::default();
        let retry = RetryConfig {
            max_attempts: parse_num("AI_MAX_ATTEMPTS").unwrap_or(retry_defaults.max_attempts),
            base_delay: parse_millis("AI_BACKOFF_BASE", 10_000),
            multiplier: parse_num("AI_BACKOFF_MULTIPLIER").unwrap_or(retry_defaults.multiplier),
        };
        if retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "AI_MAX_ATTEMPTS",
                reason: "must be at least 1".to_string(),
            });
        }

        let extractor_defaults = ExtractorConfig::default();
        let extractor = ExtractorConfig {
            fetch_timeout: parse_millis("WEBPAGE_FETCH_TIMEOUT", 10_000),
            content_max_length: parse_num("WEBPAGE_CONTENT_MAX_LENGTH")
                .unwrap_or(extractor_defaults.content_max_length),
            max_headings_per_level: parse_num("MAX_HEADINGS_PER_LEVEL")
                .unwrap_or(extractor_defaults.max_headings_per_level),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "reports.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            gemini,
            retry,
            extractor,
            directories,
            logging,
        })
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_num<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}

fn parse_millis(key: &str, default: u64) -> Duration {
    Duration::from_millis(parse_num(key).unwrap_or(default))
}
