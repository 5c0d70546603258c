//! Retry decorator for evaluator invocations.
//!
//! Keeps the orchestration loop unaware of retries: wrapping an evaluator
//! changes nothing about the record schema, only how many times a transient
//! failure is attempted before it degrades to an error marker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::EvalError;

use super::{Evaluator, EvaluatorCategory, FieldMap, Score};

/// Configuration for retry and backoff behavior.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first one
    pub max_attempts: usize,
    /// Initial backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Whether to add jitter to backoff delays
    pub jitter: bool,
}

const DEFAULT_BASE_DELAY_MS: u64 = 200;
const DEFAULT_MAX_DELAY_MS: u64 = 2_000;

impl RetryPolicy {
    /// A policy allowing `max_attempts` tries with default backoff values.
    pub fn with_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter: true,
        }
    }
}

/// Evaluator wrapper that retries transient failures using exponential backoff.
pub struct ResilientEvaluator {
    inner: Arc<dyn Evaluator>,
    policy: RetryPolicy,
}

impl ResilientEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn retry<F, Fut>(&self, mut op: F) -> Result<Score, EvalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Score, EvalError>>,
    {
        let mut attempts_left = self.policy.max_attempts;
        let mut idx = 0usize;
        let mut last_err: Option<EvalError> = None;

        while attempts_left > 0 {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempts_left == 1 || !Self::is_retryable(&err) {
                        return Err(err);
                    }
                    last_err = Some(err);
                    self.backoff_sleep(idx).await;
                    attempts_left -= 1;
                    idx += 1;
                }
            }
        }

        Err(EvalError::RetryExceeded {
            attempts: self.policy.max_attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    fn is_retryable(err: &EvalError) -> bool {
        match err {
            EvalError::Http(_) => true,
            EvalError::ResponseFormat { .. } => true,
            EvalError::Json(_) => true,
            EvalError::Auth(_) => false,
            EvalError::Configuration(_) => false,
            EvalError::DataSource(_) => false,
            EvalError::Write(_) => false,
            EvalError::RetryExceeded { .. } => false,
        }
    }

    async fn backoff_sleep(&self, attempt_index: usize) {
        let mut delay = self
            .policy
            .base_delay_ms
            .saturating_mul(1u64 << attempt_index.min(16));
        delay = delay.min(self.policy.max_delay_ms);
        if self.policy.jitter {
            let span = (delay / 2).max(1);
            let jitter = ((attempt_index as u64)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1))
                % span;
            delay = delay.saturating_sub(jitter);
        }
        sleep(Duration::from_millis(delay)).await;
    }
}

#[async_trait]
impl Evaluator for ResilientEvaluator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn category(&self) -> EvaluatorCategory {
        self.inner.category()
    }

    fn required_fields(&self) -> &[&str] {
        self.inner.required_fields()
    }

    async fn score(&self, fields: &FieldMap) -> Result<Score, EvalError> {
        self.retry(|| self.inner.score(fields)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fails with the given error until `failures` calls have happened.
    struct FlakyEvaluator {
        failures: usize,
        error: fn() -> EvalError,
        calls: AtomicUsize,
    }

    impl FlakyEvaluator {
        fn new(failures: usize, error: fn() -> EvalError) -> Self {
            Self {
                failures,
                error,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Evaluator for FlakyEvaluator {
        fn name(&self) -> &str {
            "flaky"
        }

        fn category(&self) -> EvaluatorCategory {
            EvaluatorCategory::Quality
        }

        fn required_fields(&self) -> &[&str] {
            &[]
        }

        async fn score(&self, _fields: &FieldMap) -> Result<Score, EvalError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err((self.error)())
            } else {
                Ok(Score {
                    value: 5.0,
                    reasoning: None,
                })
            }
        }
    }

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let inner = Arc::new(FlakyEvaluator::new(2, || {
            EvalError::Http("connection reset".into())
        }));
        let resilient = ResilientEvaluator::new(inner.clone(), fast_policy(3));

        let score = resilient.score(&FieldMap::new()).await.expect("retried");

        assert_eq!(score.value, 5.0);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let inner = Arc::new(FlakyEvaluator::new(1, || {
            EvalError::Auth("bad key".into())
        }));
        let resilient = ResilientEvaluator::new(inner.clone(), fast_policy(3));

        let err = resilient.score(&FieldMap::new()).await.expect_err("auth");

        assert!(matches!(err, EvalError::Auth(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn last_error_surfaces_when_attempts_run_out() {
        let inner = Arc::new(FlakyEvaluator::new(5, || {
            EvalError::Http("still down".into())
        }));
        let resilient = ResilientEvaluator::new(inner.clone(), fast_policy(2));

        let err = resilient.score(&FieldMap::new()).await.expect_err("gave up");

        assert!(matches!(err, EvalError::Http(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
