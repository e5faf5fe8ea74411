pub mod env;
mod loader;

pub use env::{AppConfig, DirectoryConfig, ExtractorConfig, GeminiConfig, RetryConfig};
pub use loader::load_config;
#[cfg(test)]
pub use loader::DEFAULT_MODELS;
