use tracing::{debug, info, warn};

use crate::{
    domain::{AnalysisResult, PageSummary},
    infrastructure::shutdown::ShutdownListener,
};

use super::{
    client::ModelClient,
    error::ScoreError,
    inference::{build_prompt, parse_analysis},
    retry::{run_candidates, Outcome, RetryPolicy},
};

pub struct Scorer<C> {
    client: C,
    candidates: Vec<String>,
    policy: RetryPolicy,
}

impl<C: ModelClient> Scorer<C> {
    pub fn new(client: C, candidates: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            client,
            candidates,
            policy,
        }
    }

    pub async fn score(
        &self,
        summary: &PageSummary,
        shutdown: &mut ShutdownListener,
    ) -> Result<AnalysisResult, ScoreError> {
        if self.candidates.is_empty() {
            return Err(ScoreError::NoCandidates);
        }

        let prompt = build_prompt(summary);
        let client = &self.client;
        let prompt = prompt.as_str();

        let outcome = run_candidates(&self.candidates, &self.policy, shutdown, |model| {
            let model = model.to_string();
            async move {
                let text = client.generate(&model, prompt).await?;
                debug!(target: "ai", model = %model, response = %text, "raw model response");
                parse_analysis(&text)
            }
        })
        .await;

        match outcome {
            Outcome::Success { mut value, model } => {
                if value.is_simulated != summary.is_simulated {
                    warn!(
                        target: "ai",
                        model = %model,
                        reported = value.is_simulated,
                        actual = summary.is_simulated,
                        "model misreported simulation mode; using extraction flag"
                    );
                }
                value.is_simulated = summary.is_simulated;
                info!(
                    target: "ai",
                    model = %model,
                    url = %summary.url,
                    authority_score = value.authority_score,
                    band = %value.score_band(),
                    tier = ?value.verdict_tier(),
                    "analysis complete"
                );
                Ok(value)
            }
            Outcome::Exhausted {
                last_error: Some(err),
            } if err.is_quota() => Err(ScoreError::QuotaExceeded(err)),
            Outcome::Exhausted {
                last_error: Some(err),
            } => Err(ScoreError::AllModelsUnavailable(err)),
            Outcome::Exhausted { last_error: None } => Err(ScoreError::NoCandidates),
            Outcome::Cancelled => Err(ScoreError::Cancelled),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use crate::ai::{client::ModelClient, error::ModelError};

    /// Replays scripted replies in order; once drained it answers 429.
    pub struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String, ModelError>>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedClient {
        pub fn new(replies: Vec<Result<String, ModelError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn models_called(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(model, _)| model.clone()).collect()
        }

        /// Seconds between consecutive calls.
        pub fn gaps(&self) -> Vec<u64> {
            self.calls
                .lock()
                .windows(2)
                .map(|pair| (pair[1].1 - pair[0].1).as_secs())
                .collect()
        }
    }

    pub fn rate_limited() -> ModelError {
        ModelError::Status {
            status: 429,
            message: "Resource has been exhausted (e.g. check quota).".to_string(),
        }
    }

    impl ModelClient for ScriptedClient {
        fn generate<'a>(
            &'a self,
            model: &'a str,
            _prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, ModelError>> {
            Box::pin(async move {
                self.calls.lock().push((model.to_string(), Instant::now()));
                let reply = self.replies.lock().pop_front();
                reply.unwrap_or_else(|| Err(rate_limited()))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{testing::*, *};
    use crate::{
        ai::error::ModelError, config::DEFAULT_MODELS,
        domain::analysis::fixtures::sample_analysis, infrastructure::shutdown::Shutdown,
    };

    fn scorer(client: ScriptedClient) -> Scorer<ScriptedClient> {
        let candidates = DEFAULT_MODELS.iter().map(|m| m.to_string()).collect();
        Scorer::new(client, candidates, RetryPolicy::default())
    }

    fn live_summary() -> PageSummary {
        let mut summary = PageSummary::restricted("https://example.com");
        summary.title = "Example".into();
        summary.content = "Plenty of words".into();
        summary.is_simulated = false;
        summary
    }

    fn sample_text() -> String {
        serde_json::to_string(&sample_analysis()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn quota_on_every_call_tries_each_model_twice() {
        let (_shutdown, mut listener) = Shutdown::new();
        let scorer = scorer(ScriptedClient::new(Vec::new()));

        let err = scorer
            .score(&live_summary(), &mut listener)
            .await
            .unwrap_err();

        assert!(matches!(err, ScoreError::QuotaExceeded(_)));
        assert_eq!(
            scorer.client.models_called(),
            vec![
                "gemini-2.5-flash",
                "gemini-2.5-flash",
                "gemini-2.0-flash-lite",
                "gemini-2.0-flash-lite",
                "gemini-2.0-flash",
                "gemini-2.0-flash",
            ]
        );
        assert_eq!(scorer.client.gaps(), vec![10, 20, 10, 20, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_reply_abandons_model_after_one_attempt() {
        let (_shutdown, mut listener) = Shutdown::new();
        let scorer = scorer(ScriptedClient::new(vec![
            Ok("Sorry, I cannot produce an audit for this page.".to_string()),
            Ok(sample_text()),
        ]));

        let analysis = scorer.score(&live_summary(), &mut listener).await.unwrap();

        assert_eq!(analysis, sample_analysis());
        assert_eq!(
            scorer.client.models_called(),
            vec!["gemini-2.5-flash", "gemini-2.0-flash-lite"]
        );
        assert_eq!(scorer.client.gaps(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn fenced_reply_matches_bare_reply() {
        let (_shutdown, mut listener) = Shutdown::new();
        let fenced = scorer(ScriptedClient::new(vec![Ok(format!(
            "```json\n{}\n```",
            sample_text()
        ))]));
        let bare = scorer(ScriptedClient::new(vec![Ok(sample_text())]));

        let fenced = fenced.score(&live_summary(), &mut listener).await.unwrap();
        let bare = bare.score(&live_summary(), &mut listener).await.unwrap();
        assert_eq!(fenced, bare);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_retries_same_model() {
        let (_shutdown, mut listener) = Shutdown::new();
        let scorer = scorer(ScriptedClient::new(vec![
            Err(ModelError::Status {
                status: 503,
                message: "The model is overloaded.".into(),
            }),
            Ok(sample_text()),
        ]));

        scorer.score(&live_summary(), &mut listener).await.unwrap();
        assert_eq!(
            scorer.client.models_called(),
            vec!["gemini-2.5-flash", "gemini-2.5-flash"]
        );
        assert_eq!(scorer.client.gaps(), vec![10]);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_everywhere_report_unavailable() {
        let (_shutdown, mut listener) = Shutdown::new();
        let bad_request = || {
            Err(ModelError::Status {
                status: 400,
                message: "Invalid argument".into(),
            })
        };
        let scorer = scorer(ScriptedClient::new(vec![
            bad_request(),
            bad_request(),
            bad_request(),
        ]));

        let err = scorer
            .score(&live_summary(), &mut listener)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::AllModelsUnavailable(_)));
        assert_eq!(scorer.client.models_called().len(), 3);
        assert_eq!(scorer.client.gaps(), vec![0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let (shutdown, mut listener) = Shutdown::new();
        let scorer = scorer(ScriptedClient::new(Vec::new()));
        shutdown.trigger_after(Duration::from_secs(5));

        let err = scorer
            .score(&live_summary(), &mut listener)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::Cancelled));
        assert_eq!(scorer.client.models_called().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn simulation_flag_follows_extraction() {
        let (_shutdown, mut listener) = Shutdown::new();
        let scorer = scorer(ScriptedClient::new(vec![Ok(sample_text())]));
        let restricted = PageSummary::restricted("https://bank.example.com");

        let analysis = scorer.score(&restricted, &mut listener).await.unwrap();
        assert!(analysis.is_simulated);

        let mut echoed = sample_analysis();
        echoed.is_simulated = true;
        let scorer = super::Scorer::new(
            ScriptedClient::new(vec![Ok(serde_json::to_string(&echoed).unwrap())]),
            vec!["only".to_string()],
            RetryPolicy::default(),
        );
        let analysis = scorer.score(&live_summary(), &mut listener).await.unwrap();
        assert!(!analysis.is_simulated);
    }

    #[tokio::test]
    async fn empty_candidate_list_is_rejected() {
        let (_shutdown, mut listener) = Shutdown::new();
        let scorer = Scorer::new(
            ScriptedClient::new(Vec::new()),
            Vec::new(),
            RetryPolicy::default(),
        );
        let err = scorer
            .score(&live_summary(), &mut listener)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::NoCandidates));
    }
}
