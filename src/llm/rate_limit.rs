//! Client-side request throttling.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum interval between outbound requests.
///
/// The last-request timestamp sits behind a mutex that is held across the
/// wait, so concurrent callers queue up one interval apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until a request is allowed, then record it as issued now.
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&self) -> Duration {
        let mut last = self.last_request.lock().await;

        let waited = match *last {
            Some(prev) => {
                let elapsed = prev.elapsed();
                if elapsed < self.min_interval {
                    let wait = self.min_interval - elapsed;
                    debug!(wait_ms = wait.as_millis() as u64, "Throttling classifier request");
                    tokio::time::sleep(wait).await;
                    wait
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };

        *last = Some(Instant::now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_request_is_not_delayed() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        assert_eq!(limiter.acquire().await, Duration::ZERO);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_waits_remaining_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        limiter.acquire().await;

        tokio::time::advance(Duration::from_millis(300)).await;

        let start = Instant::now();
        let waited = limiter.acquire().await;
        assert_eq!(waited, Duration::from_millis(700));
        assert!(start.elapsed() >= waited);
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_after_interval_has_passed() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spaced_out() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut issued = Vec::new();
        for h in handles {
            issued.push(h.await.unwrap().duration_since(start));
        }
        issued.sort();

        assert_eq!(issued[0], Duration::ZERO);
        assert!(issued[1] >= Duration::from_secs(1));
        assert!(issued[2] >= Duration::from_secs(2));
    }
}
