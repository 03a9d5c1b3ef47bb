use std::time::Duration;

use crate::config::RetryConfig;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server-side failure; worth another attempt.
    Transient,
    /// Client-side failure or missing object; never retried.
    Fatal,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Bounded retry with linear backoff (`attempt * base_delay`), no jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `n * base_delay` before attempt `n + 1`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Build from the optional `[retry]` config section; missing means defaults.
    pub fn from_config(cfg: Option<&RetryConfig>) -> Self {
        cfg.map(|r| RetryPolicy {
            max_attempts: r.max_attempts.max(1),
            base_delay: Duration::from_millis(r.base_delay_ms),
        })
        .unwrap_or_default()
    }

    /// Decide whether to retry after a failed attempt.
    ///
    /// `attempt` is 1-based (1 = first attempt).
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match kind {
            ErrorKind::Fatal => RetryDecision::NoRetry,
            ErrorKind::Transient => RetryDecision::RetryAfter(self.base_delay.saturating_mul(attempt)),
        }
    }
}
