use std::{fmt, future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{config::RetryConfig, infrastructure::shutdown::ShutdownListener};

use super::error::ModelError;

#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub retryable: fn(&ModelError) -> bool,
}

impl RetryPolicy {
    /// Delay slept after the `attempt`-th failure (1-based) on one candidate.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("multiplier", &self.multiplier)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            multiplier: config.multiplier,
            retryable: ModelError::is_retryable,
        }
    }
}

#[derive(Debug)]
pub enum Outcome<T> {
    Success { value: T, model: String },
    Exhausted { last_error: Option<ModelError> },
    Cancelled,
}

/// Tries each candidate in order, retrying retryable failures with backoff.
///
/// The delay restarts at `base_delay` for every candidate. A retryable failure
/// is followed by a backoff sleep whenever another attempt follows, including
/// the first attempt of the next candidate. A non-retryable failure moves to
/// the next candidate immediately. Every call and every sleep is raced against
/// `shutdown`.
pub async fn run_candidates<T, F, Fut>(
    candidates: &[String],
    policy: &RetryPolicy,
    shutdown: &mut ShutdownListener,
    mut call: F,
) -> Outcome<T>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<T, ModelError>>,
{
    let mut last_error = None;

    for (index, model) in candidates.iter().enumerate() {
        let final_candidate = index + 1 == candidates.len();

        for attempt in 1..=policy.max_attempts {
            info!(target: "ai", model = %model, attempt, "invoking model");
            let result = tokio::select! {
                biased;
                _ = shutdown.notified() => return Outcome::Cancelled,
                res = call(model.as_str()) => res,
            };

            let err = match result {
                Ok(value) => {
                    return Outcome::Success {
                        value,
                        model: model.clone(),
                    }
                }
                Err(err) => err,
            };

            let retryable = (policy.retryable)(&err);
            let nothing_left = final_candidate && attempt == policy.max_attempts;
            if !retryable {
                warn!(target: "ai", model = %model, attempt, error = %err, "non-retryable failure; abandoning model");
                last_error = Some(err);
                break;
            }
            if nothing_left {
                warn!(target: "ai", model = %model, attempt, error = %err, "retryable failure on last attempt");
                last_error = Some(err);
                break;
            }

            let delay = policy.delay_after(attempt);
            warn!(
                target: "ai",
                model = %model,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retryable failure; backing off"
            );
            last_error = Some(err);
            tokio::select! {
                biased;
                _ = shutdown.notified() => return Outcome::Cancelled,
                _ = sleep(delay) => {}
            }
        }

        if !final_candidate {
            warn!(target: "ai", model = %model, "model exhausted; falling back to next candidate");
        }
    }

    match &last_error {
        Some(err) => error!(target: "ai", error = %err, "all candidate models failed"),
        None => error!(target: "ai", "no candidate models to try"),
    }
    Outcome::Exhausted { last_error }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;
    use crate::infrastructure::shutdown::Shutdown;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(10));
        assert_eq!(policy.delay_after(2), Duration::from_secs(20));
        assert_eq!(policy.delay_after(3), Duration::from_secs(40));
    }

    #[test]
    fn huge_exponents_saturate() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_after(200) >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_predicate_disables_retries() {
        let (_shutdown, mut listener) = Shutdown::new();
        let policy = RetryPolicy {
            retryable: |_| false,
            ..RetryPolicy::default()
        };
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let outcome: Outcome<()> = run_candidates(
            &models(&["a", "b"]),
            &policy,
            &mut listener,
            |_model| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ModelError::Status {
                        status: 503,
                        message: "overloaded".into(),
                    })
                }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(
            outcome,
            Outcome::Exhausted {
                last_error: Some(ModelError::Status { status: 503, .. })
            }
        ));
    }

    #[tokio::test]
    async fn empty_candidate_list_is_exhausted_without_error() {
        let (_shutdown, mut listener) = Shutdown::new();
        let outcome: Outcome<()> =
            run_candidates(&[], &RetryPolicy::default(), &mut listener, |_model| async {
                Ok(())
            })
            .await;
        assert!(matches!(outcome, Outcome::Exhausted { last_error: None }));
    }

    #[tokio::test(start_paused = true)]
    async fn success_reports_winning_model() {
        let (_shutdown, mut listener) = Shutdown::new();
        let outcome = run_candidates(
            &models(&["primary", "backup"]),
            &RetryPolicy::default(),
            &mut listener,
            |model| {
                let model = model.to_string();
                async move {
                    if model == "primary" {
                        Err(ModelError::EmptyResponse)
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;
        match outcome {
            Outcome::Success { value, model } => {
                assert_eq!(value, 42);
                assert_eq!(model, "backup");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
