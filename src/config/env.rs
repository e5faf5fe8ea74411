use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub retry: RetryConfig,
    pub extractor: ExtractorConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    /// Candidate models, most capable first.
    pub models: Vec<String>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub fetch_timeout: Duration,
    pub content_max_length: usize,
    pub max_headings_per_level: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            content_max_length: 5_000,
            max_headings_per_level: 10,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(10),
            multiplier: 2,
        }
    }
}
