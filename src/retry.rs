//! Retry orchestration with exponential backoff.
//!
//! [`RetryPolicy`] is pure data; [`RetryController`] owns the loop and is
//! handed its retry predicate and per-attempt observer by the caller, so
//! the policy for "what is retryable" lives with whoever constructs the
//! controller rather than inside it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::Result;

/// Backoff schedule: `initial_delay * backoff_factor^attempt`, capped at
/// `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `3` allows up to 4 attempts total.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Delay before re-running after a failure on `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64;
        let cap = self.max_delay.as_millis() as f64;
        // powi saturates to infinity for large exponents; min() brings
        // that back to the cap.
        let scaled = base * self.backoff_factor.powi(attempt.min(i32::MAX as u32) as i32);
        Duration::from_millis(scaled.min(cap) as u64)
    }
}

type RetryPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;
type RetryObserver = Arc<dyn Fn(u32, &Error) + Send + Sync>;

/// Runs an async operation until it succeeds, the failure is ruled
/// non-retryable, or the policy's attempt budget is spent.
#[derive(Clone)]
pub struct RetryController {
    policy: RetryPolicy,
    should_retry: Option<RetryPredicate>,
    on_retry: Option<RetryObserver>,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            should_retry: None,
            on_retry: None,
        }
    }

    /// Install the predicate deciding whether a failure is retryable.
    /// Without one, every failure is.
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&Error) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Install an observer invoked before each retry with the 1-based
    /// number of the attempt that just failed.
    pub fn with_observer(mut self, observer: impl Fn(u32, &Error) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Override the attempt budget, keeping predicate and observer.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drive `operation` to completion under the policy.
    ///
    /// The final failure is returned as-is; intermediate failures are only
    /// seen by the observer.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let retryable = self
                        .should_retry
                        .as_ref()
                        .map(|pred| pred(&err))
                        .unwrap_or(true);
                    if attempt >= self.policy.max_retries || !retryable {
                        return Err(err);
                    }
                    if let Some(observer) = &self.on_retry {
                        observer(attempt + 1, &err);
                    }
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for RetryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryController")
            .field("policy", &self.policy)
            .field("has_predicate", &self.should_retry.is_some())
            .field("has_observer", &self.on_retry.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(4))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for(30), Duration::from_millis(350));
    }

    #[test]
    fn test_backoff_survives_huge_attempt_numbers() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX), policy.max_delay);
    }

    #[tokio::test]
    async fn test_success_after_two_failures_notifies_observer() {
        let calls = Arc::new(AtomicU32::new(0));
        let observed: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        let controller = {
            let observed = observed.clone();
            RetryController::new(fast_policy(3))
                .with_observer(move |attempt, _err| observed.lock().unwrap().push(attempt))
        };

        let result = {
            let calls = calls.clone();
            controller
                .run(move || {
                    let calls = calls.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(Error::http_failure(503, serde_json::Value::Null))
                        } else {
                            Ok("done")
                        }
                    }
                })
                .await
        };

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*observed.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let controller = RetryController::new(fast_policy(2));

        let result: Result<()> = {
            let calls = calls.clone();
            controller
                .run(move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(Error::Timeout { timeout_ms: 10 })
                    }
                })
                .await
        };

        assert!(matches!(result, Err(Error::Timeout { timeout_ms: 10 })));
        // max_retries=2 means three attempts in total.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let controller = RetryController::new(fast_policy(0));

        let result: Result<()> = {
            let calls = calls.clone();
            controller
                .run(move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(Error::api("nope"))
                    }
                })
                .await
        };

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let controller =
            RetryController::new(fast_policy(5)).with_predicate(|err| err.is_retryable());

        let result: Result<()> = {
            let calls = calls.clone();
            controller
                .run(move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(Error::http_failure(404, serde_json::Value::Null))
                    }
                })
                .await
        };

        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_immediate_success_skips_observer() {
        let observed: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let controller = {
            let observed = observed.clone();
            RetryController::new(fast_policy(3))
                .with_observer(move |attempt, _| observed.lock().unwrap().push(attempt))
        };

        let result = controller.run(|| async { Ok(42u32) }).await;
        assert_eq!(result.unwrap(), 42);
        assert!(observed.lock().unwrap().is_empty());
    }
}
