//! Bounded retry for transient remote failures.

use super::error::{WafError, WafResult};
use crate::config::RetryConfig;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;

/// Exponential backoff with an overall deadline per error class.
///
/// Only [`WafError::is_retryable`] errors are retried. Blocked deletes
/// ([`WafError::AssociatedItem`]) use the shorter associated item budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    timeout: Duration,
    associated_item_timeout: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Build a policy from the `[retry]` configuration section
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            timeout: config.timeout(),
            associated_item_timeout: config.associated_item_timeout(),
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            multiplier: config.backoff_multiplier.max(1.0),
        }
    }

    /// Policy that never retries
    #[must_use]
    pub fn none() -> Self {
        Self {
            timeout: Duration::ZERO,
            associated_item_timeout: Duration::ZERO,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Overall budget for `error`, zero when it must not be retried
    pub fn budget(&self, error: &WafError) -> Duration {
        match error {
            WafError::AssociatedItem { .. } => self.associated_item_timeout,
            e if e.is_retryable() => self.timeout,
            _ => Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (starting at 0)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(32) as i32);
        let secs = self.initial_backoff.as_secs_f64() * factor;
        if secs.is_finite() && secs < self.max_backoff.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_backoff
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// next delay would overrun the budget of the last error.
    ///
    /// # Errors
    ///
    /// Returns the last error from `op`.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> WafResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WafResult<T>>,
    {
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !error.is_retryable() {
                return Err(error);
            }

            let delay = self.backoff(attempt);
            if started.elapsed() + delay > self.budget(&error) {
                return Err(error);
            }

            attempt += 1;
            warn!(
                "{} failed (attempt {}), retrying in {:?}: {}",
                what, attempt, delay, error
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waf::error::Operation;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            timeout_secs: 5,
            associated_item_timeout_secs: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            backoff_multiplier: 2.0,
        })
    }

    fn transient() -> WafError {
        WafError::TransientService {
            resource: "acl".to_string(),
            operation: Operation::Update,
            message: "unavailable".to_string(),
        }
    }

    fn conflict() -> WafError {
        WafError::Conflict {
            resource: "acl".to_string(),
            operation: Operation::Update,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = fast();
        assert_eq!(policy.backoff(0), Duration::from_millis(1));
        assert_eq!(policy.backoff(1), Duration::from_millis(2));
        assert_eq!(policy.backoff(2), Duration::from_millis(4));
        assert_eq!(policy.backoff(10), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let value = fast()
            .run("update", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_conflicts_are_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: WafResult<()> = fast()
            .run("update", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            })
            .await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conflict_fails_fast_without_backoff() {
        // zero backoff leaves the budget untouched, so only the error class stops the loop
        let policy = RetryPolicy::from_config(&RetryConfig {
            timeout_secs: 5,
            associated_item_timeout_secs: 5,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
        });
        assert_eq!(policy.backoff(0), Duration::ZERO);

        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: WafResult<()> = policy
            .run("update", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            })
            .await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: WafResult<()> = RetryPolicy::none()
            .run("delete", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_budget_per_error_class() {
        let policy = fast();
        assert_eq!(policy.budget(&transient()), Duration::from_secs(5));
        let blocked = WafError::AssociatedItem {
            resource: "ipset".to_string(),
            operation: Operation::Delete,
            message: "referenced".to_string(),
        };
        assert_eq!(policy.budget(&blocked), Duration::from_secs(1));
        assert_eq!(
            policy.budget(&WafError::validation("statement", "bad")),
            Duration::ZERO
        );
    }
}
