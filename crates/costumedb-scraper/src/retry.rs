//! Retry policy for whole-page scrapes.
//!
//! A failed page load is retried from scratch after a fixed delay when the
//! error is flagged retriable. Terminal errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use costumedb_core::AppConfig;

use crate::error::ScrapeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy that tries exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.scraper_max_attempts,
            Duration::from_secs(config.scraper_retry_delay_secs),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// Runs `operation` until it succeeds, fails terminally, or the policy's
/// attempts are used up.
///
/// Only errors for which [`ScrapeError::is_retriable`] is `true` are retried.
/// After the last attempt the final error is returned.
pub async fn retry_with_delay<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= max_attempts {
                    return Err(err);
                }
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient scrape failure, retrying after delay"
                );
            }
        }

        if !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BrowserError, BrowserErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn not_ready() -> ScrapeError {
        ScrapeError::NotReady {
            url: "https://www.amazon.com/dp/B000000001".to_owned(),
            selector: "#productTitle".to_owned(),
            timeout_ms: 0,
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_delay(policy(3), || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ScrapeError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failure_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_delay(policy(3), || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(not_ready())
                } else {
                    Ok::<u32, ScrapeError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_error_after_exhausting_attempts() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_delay(policy(2), || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScrapeError>(not_ready())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(ScrapeError::NotReady { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_terminal_error() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_delay(policy(3), || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScrapeError>(ScrapeError::Navigation {
                    url: "https://www.amazon.com/dp/B000000001".to_owned(),
                    source: BrowserError::new(BrowserErrorKind::Other, "net::ERR_NAME_NOT_RESOLVED"),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScrapeError::Navigation { .. })));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
