use futures::future::BoxFuture;
use reqwest::Client;

use crate::config::GeminiConfig;

use super::{
    error::ModelError,
    inference::{build_request, error_message, parse_response},
};

/// One text-generation backend; `model` selects the candidate to invoke.
pub trait ModelClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, ModelError>>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(http: Client, config: GeminiConfig) -> Self {
        if config.api_key.is_none() {
            tracing::warn!(
                target: "ai",
                "GEMINI_API_KEY is not set; every scoring request will fail"
            );
        }
        Self { http, config }
    }

    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, ModelError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(ModelError::MissingCredential)?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            model
        );
        let response = self
            .http
            .post(endpoint)
            .header("x-goog-api-key", api_key)
            .timeout(self.config.request_timeout)
            .json(&build_request(prompt))
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_response(response).await
    }
}

impl ModelClient for GeminiClient {
    fn generate<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, ModelError>> {
        Box::pin(self.generate_content(model, prompt))
    }
}
