//! Retry with exponential backoff for external calls

use std::future::Future;
use std::time::Duration;

use crate::error::ItemError;

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Backoff doubling from `base`: base, 2*base, 4*base, ...
pub fn scaled_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Retry a fallible async call with exponential backoff.
///
/// On retryable errors, logs the failure, sleeps and retries up to
/// `max_retries` times. Returns the first success, or the final error on
/// exhaustion / non-retryable error.
pub async fn retry_with_backoff<T, F, Fut>(
    label: &str,
    max_retries: u32,
    mut attempt_fn: F,
) -> Result<T, ItemError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ItemError>>,
{
    let mut attempt = 0u32;
    loop {
        match attempt_fn().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                log::debug!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                tokio::time::sleep(backoff_duration(attempt)).await;
            }
            Err(e) => {
                log::warn!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}
