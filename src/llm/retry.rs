//! Retry with exponential backoff for remote model calls.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Total attempts for a remote call, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base unit for backoff; attempt `n` failing waits `base * 2^n`.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Retry policy: `max_attempts` tries, sleeping `base * 2^attempt` after each
/// failure except the last (attempts are numbered from 1, so 2s, 4s, ...).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    /// Delay after attempt `attempt` (1-based) fails.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Returns `None` once every attempt has failed; the errors are logged, not
/// returned.
pub(crate) async fn with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    provider: &str,
    mut op: F,
) -> Option<T>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(value) => return Some(value),
            Err(e) if attempt == attempts => {
                error!(
                    provider,
                    attempt,
                    attempts,
                    error = %e,
                    "Classifier request failed, giving up"
                );
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    provider,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Classifier request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    None
}
