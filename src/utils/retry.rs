// dashboardtool/src/utils/retry.rs
use std::future::Future;
use std::time::Duration;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

/// Invokes `probe` until it reports `true`, sleeping `interval` between
/// attempts. Fails with `RetryExhausted` once `attempts` probes came back
/// `false`. A probe error ends the loop immediately.
pub async fn retry<F, Fut>(policy: RetryPolicy, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let mut attempt = 0;
    loop {
        if probe().await? {
            return Ok(());
        }
        attempt += 1;
        if attempt >= policy.attempts {
            return Err(AppError::RetryExhausted {
                attempts: policy.attempts,
            });
        }
        tracing::debug!("Attempt {}/{} not yet successful, waiting", attempt, policy.attempts);
        tokio::time::sleep(policy.interval).await;
    }
}
