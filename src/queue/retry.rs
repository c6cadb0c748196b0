//! General retry wrapper with exponential backoff
//!
//! Independent of the request queue: a call may go through the queue, through
//! this wrapper, through both, or through neither. Unlike the queue's
//! 429-specific path, this wrapper retries any failure, except 404 which is a
//! valid "not found" outcome and resolves to `None` without retrying.

use crate::queue::request_queue::backoff_delay;
use crate::utils::error::MaglineError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Retry policy for the general wrapper
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(3),
        }
    }
}

/// Run `op`, retrying any failure up to `max_retries` times with
/// `base_delay * 2^attempt` backoff.
///
/// A 404-shaped error resolves to `Ok(None)` immediately; success resolves to
/// `Ok(Some(value))`. Once retries are exhausted the last error is surfaced.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<Option<T>, MaglineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MaglineError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(Some(value)),
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => {
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                let delay = backoff_delay(policy.base_delay, attempt);
                debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "request failed, backing off before retry"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
