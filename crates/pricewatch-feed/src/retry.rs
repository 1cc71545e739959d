//! Exponential backoff for calls to the pricing service.
//!
//! Only transient failures are retried: HTTP 429 and network-level errors.
//! Everything else (404, other non-2xx statuses, malformed bodies, explicit
//! rejections) is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::FeedError;

fn is_retriable(err: &FeedError) -> bool {
    matches!(err, FeedError::RateLimited { .. } | FeedError::Http(_))
}

/// Executes `operation`, retrying transient errors up to `max_retries` times.
///
/// The wait before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)`
/// seconds, so with `max_retries = 3` the operation runs at most 4 times.
/// When retries are exhausted the last error is returned.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "feed: transient pricing service error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
