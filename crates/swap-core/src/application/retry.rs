//! # Retry With Backoff
//!
//! Ledger calls that fail with `ChainUnavailable` are retried with an
//! exponentially growing delay. Any other error is returned at once.

use std::future::Future;
use tracing::{error, warn};

use crate::config::RetryPolicy;
use crate::domain::SwapError;

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, SwapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SwapError>>,
{
    let mut failures: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                failures = failures.saturating_add(1);
                if !policy.allows(failures) {
                    error!("[swap] {} failed after {} attempts: {}", what, failures, err);
                    return Err(err);
                }
                let delay = policy.delay_for(failures - 1);
                warn!(
                    "[swap] {} failed (attempt {}), retrying in {:?}: {}",
                    what, failures, delay, err
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
