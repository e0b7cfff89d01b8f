//! Bounded retry with exponential backoff for sink dispatch.
//!
//! Implements exponential backoff with an optional jitter, max delay cap,
//! an overall deadline, and retryable/non-retryable error classification.

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{NotifyError, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay between attempts. Actual delay = base * 2^failures + jitter.
    pub initial_delay: Duration,
    /// Hard cap on the computed delay to prevent unbounded growth.
    pub max_delay: Duration,
    /// Deadline for the whole retry sequence, sleeps included.
    pub overall_deadline: Duration,
    /// When true, adds random jitter of [0, initial_delay/2) to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            overall_deadline: Duration::from_secs(10 * 60),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Compute the delay after a given number of failed attempts (0-indexed).
    fn delay_after_failure(&self, failures: u32) -> Duration {
        // 2^failures is computed with a checked shift so large counts saturate
        // instead of overflowing `Duration`.
        let multiplier = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
        let exp_delay = self
            .initial_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay);
        let capped = exp_delay.min(self.max_delay);

        if !self.jitter {
            return capped;
        }

        // Jitter is limited so the final delay never exceeds `max_delay`.
        let jitter_range_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX) / 2;
        if jitter_range_ms == 0 {
            return capped;
        }

        let remaining_ms =
            u64::try_from(self.max_delay.saturating_sub(capped).as_millis()).unwrap_or(0);
        let jitter_limit_ms = jitter_range_ms.min(remaining_ms);
        if jitter_limit_ms == 0 {
            return capped;
        }

        let jitter_ms = rand::rng().random_range(0..jitter_limit_ms);
        (capped + Duration::from_millis(jitter_ms)).min(self.max_delay)
    }
}

/// Execute an async operation with retry-and-backoff.
///
/// The `operation` closure receives the current attempt number (1-indexed)
/// and returns the operation result; [`NotifyError::is_retryable`] decides
/// whether a failure consumes another attempt. The whole sequence, backoff
/// sleeps included, is bounded by the policy deadline, which surfaces as
/// [`NotifyError::Timeout`] distinct from attempt exhaustion.
pub async fn retry<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(
        policy.overall_deadline,
        retry_attempts(policy, cancel, operation),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(NotifyError::Timeout {
            reason: format!("retry budget of {:?} exhausted", policy.overall_deadline),
        }),
    }
}

async fn retry_attempts<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        if cancel.is_cancelled() {
            return Err(NotifyError::Cancelled);
        }

        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt >= policy.max_attempts {
            return Err(NotifyError::RetriesExhausted {
                attempts: attempt,
                source: Box::new(err),
            });
        }

        let delay = policy.delay_after_failure(attempt - 1);
        warn!(
            attempt,
            max = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed, retrying after backoff"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(NotifyError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            overall_deadline: Duration::from_secs(5),
            jitter: false,
        }
    }

    fn server_error() -> NotifyError {
        NotifyError::http_status(
            StatusCode::SERVICE_UNAVAILABLE,
            "https://example.com",
            "test",
        )
    }

    fn client_error() -> NotifyError {
        NotifyError::http_status(StatusCode::BAD_REQUEST, "https://example.com", "test")
    }

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            jitter: false,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after_failure(0), Duration::from_secs(2));
        assert_eq!(policy.delay_after_failure(1), Duration::from_secs(4));
        assert_eq!(policy.delay_after_failure(2), Duration::from_secs(8));
        assert_eq!(policy.delay_after_failure(3), Duration::from_secs(16));
        assert_eq!(policy.delay_after_failure(4), Duration::from_secs(30));
        assert_eq!(policy.delay_after_failure(31), Duration::from_secs(30));
    }

    #[test]
    fn jitter_never_exceeds_max_delay() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(1),
            jitter: true,
            ..RetryPolicy::default()
        };
        for failures in 0..8 {
            let delay = policy.delay_after_failure(failures);
            assert!(delay <= Duration::from_secs(1));
        }
    }

    #[tokio::test]
    async fn success_returns_immediately() {
        let cancel = CancellationToken::new();
        let result = retry(&fast_policy(), &cancel, |_| async { Ok(42u32) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn server_error_consumes_all_attempts() {
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let result: Result<()> = retry(&fast_policy(), &cancel, |_| {
            attempts.fetch_add(1, Ordering::Relaxed);
            async { Err(server_error()) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::Relaxed), 3);
        match result.unwrap_err() {
            NotifyError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, NotifyError::HttpStatus { .. }));
            }
            other => panic!("expected RetriesExhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn client_error_aborts_after_one_attempt() {
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let result: Result<()> = retry(&fast_policy(), &cancel, |_| {
            attempts.fetch_add(1, Ordering::Relaxed);
            async { Err(client_error()) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::Relaxed), 1);
        assert!(matches!(
            result.unwrap_err(),
            NotifyError::HttpStatus { .. }
        ));
    }

    #[tokio::test]
    async fn success_on_second_attempt() {
        let cancel = CancellationToken::new();
        let result = retry(&fast_policy(), &cancel, |attempt| async move {
            if attempt == 1 {
                Err(server_error())
            } else {
                Ok(attempt)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_backoff_sleep() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(60),
            ..RetryPolicy::default()
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result: Result<()> = retry(&policy, &cancel, |_| async { Err(server_error()) }).await;

        assert!(matches!(result, Err(NotifyError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn deadline_expiry_is_distinct_from_exhaustion() {
        let policy = RetryPolicy {
            max_attempts: 100,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(50),
            overall_deadline: Duration::from_millis(80),
            jitter: false,
        };
        let cancel = CancellationToken::new();

        let result: Result<()> = retry(&policy, &cancel, |_| async { Err(server_error()) }).await;
        assert!(matches!(result, Err(NotifyError::Timeout { .. })));
    }
}
