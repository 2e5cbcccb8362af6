//! Retry/backoff policy for the HTTP transport.
//!
//! Pure decision logic; the transport owns the sleeping.
//!
//! # Rules
//! - 5xx, 408 and 429 are retried up to `max_retries` times.
//! - Delay is `base_delay * 2^(attempt + 1)`, so 2s, 4s, 8s, 16s by default.
//! - A 429 carrying a rate-limit reset waits for the reset instead. If that
//!   wait exceeds `max_rate_limit_wait` the 429 is returned as-is.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Epoch values below this are read as "seconds from now".
const EPOCH_THRESHOLD: i64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            max_rate_limit_wait: Duration::from_secs(60),
        }
    }
}

/// What the transport should do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Return,
    RetryAfter(Duration),
}

impl RetryPolicy {
    pub fn is_retryable_status(status: u16) -> bool {
        status >= 500 || status == 408 || status == 429
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt + 1))
    }

    /// `attempt` is zero-based: the number of retries already made.
    /// `rate_limit_reset` is the raw header value, if any.
    pub fn decide(
        &self,
        status: u16,
        attempt: u32,
        rate_limit_reset: Option<&str>,
        now: DateTime<Utc>,
    ) -> RetryDecision {
        if attempt >= self.max_retries || !Self::is_retryable_status(status) {
            return RetryDecision::Return;
        }

        if status == 429 {
            if let Some(wait) = rate_limit_reset.and_then(|raw| reset_wait(raw, now)) {
                if wait > self.max_rate_limit_wait {
                    return RetryDecision::Return;
                }
                return RetryDecision::RetryAfter(wait);
            }
        }

        RetryDecision::RetryAfter(self.backoff(attempt))
    }
}

fn reset_wait(raw: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value: i64 = raw.trim().parse().ok()?;
    let secs = if value >= EPOCH_THRESHOLD {
        value - now.timestamp()
    } else {
        value
    };
    Some(Duration::from_secs(secs.max(0) as u64))
}
