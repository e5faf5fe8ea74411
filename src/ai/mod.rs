pub mod client;
pub mod error;
pub mod inference;
pub mod retry;
pub mod scorer;

pub use client::{GeminiClient, ModelClient};
pub use error::ScoreError;
pub use retry::RetryPolicy;
pub use scorer::Scorer;
