//! Retry loop: run an async store operation until success or policy says stop.

use std::future::Future;

use super::classify::classify;
use super::error::StoreError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `op` until it succeeds or the retry policy says to stop.
/// On a transient failure, sleeps for the backoff duration then tries again;
/// the last error is returned unchanged.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = d.as_millis() as u64,
                        "{} failed: {}; retrying",
                        what,
                        e
                    );
                    tokio::time::sleep(d).await;
                    attempt += 1;
                }
            },
        }
    }
}
