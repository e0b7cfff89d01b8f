//! Token-bucket rate limiting for outbound sink calls.
//!
//! One bucket is shared across every sink dispatch of a single run, so the
//! at-most-two outbound calls cannot burst faster than the configured rate.
//! State is process-local and never persisted.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{NotifyError, Result};

/// Configuration for a rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum tokens (burst capacity).
    pub max_tokens: u32,
    /// Tokens added per second.
    pub refill_rate: f64,
    /// Initial tokens.
    pub initial_tokens: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2,
            refill_rate: 1.0 / 5.0, // 1 token per 5 seconds
            initial_tokens: 2,
        }
    }
}

/// Token bucket rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    /// Current number of tokens.
    tokens: f64,
    /// Maximum tokens (burst capacity).
    max_tokens: u32,
    /// Tokens added per second.
    refill_rate: f64,
    /// Last refill time.
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            tokens: config.initial_tokens as f64,
            max_tokens: config.max_tokens,
            refill_rate: config.refill_rate,
            last_refill: Instant::now(),
        }
    }

    /// Try to acquire a token without waiting.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Acquire a token, waiting for refill if necessary.
    ///
    /// Returns the duration waited, or [`NotifyError::Cancelled`] as soon as
    /// `cancel` fires during the wait.
    pub async fn acquire(&mut self, cancel: &CancellationToken) -> Result<Duration> {
        let mut total_wait = Duration::ZERO;

        loop {
            self.refill();

            if self.tokens >= 1.0 {
                self.tokens -= 1.0;
                return Ok(total_wait);
            }

            let tokens_needed = 1.0 - self.tokens;
            let wait = Duration::from_secs_f64(tokens_needed / self.refill_rate);

            debug!(wait = ?wait, "rate limited, waiting for token");
            tokio::select! {
                _ = cancel.cancelled() => return Err(NotifyError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
            total_wait += wait;
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let new_tokens = elapsed.as_secs_f64() * self.refill_rate;

        self.tokens = (self.tokens + new_tokens).min(self.max_tokens as f64);
        self.last_refill = now;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}
