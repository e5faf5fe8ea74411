use thiserror::Error;

const TRANSIENT_MARKERS: [&str; 6] = [
    "quota",
    "fetch failed",
    "timeout",
    "timed out",
    "connect timeout",
    "service unavailable",
];

/// Failure of a single model invocation.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("model returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("GEMINI_API_KEY is not configured")]
    MissingCredential,
    #[error("model response did not contain a valid JSON object: {0}")]
    MalformedResponse(String),
    #[error("model response contained no text")]
    EmptyResponse,
}

impl ModelError {
    pub fn from_transport(err: reqwest::Error) -> Self {
        ModelError::Transport(err.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Status { status, message } => {
                matches!(status, 429 | 500 | 503) || mentions_transient(message)
            }
            // Transport failures never reached the model.
            ModelError::Transport(_) => true,
            ModelError::MissingCredential
            | ModelError::MalformedResponse(_)
            | ModelError::EmptyResponse => false,
        }
    }

    pub fn is_quota(&self) -> bool {
        match self {
            ModelError::Status { status: 429, .. } => true,
            ModelError::Status { message, .. } | ModelError::Transport(message) => {
                message.to_lowercase().contains("quota")
            }
            _ => false,
        }
    }
}

fn mentions_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Final scoring failure, surfaced to the caller once every candidate is spent.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("AI quota exceeded: the daily limit for this API key has been reached. Try again later or upgrade the key.")]
    QuotaExceeded(#[source] ModelError),
    #[error("AI gateway is currently congested: all fallback models reported high latency or failure.")]
    AllModelsUnavailable(#[source] ModelError),
    #[error("no candidate models are configured")]
    NoCandidates,
    #[error("scoring was cancelled")]
    Cancelled,
}
