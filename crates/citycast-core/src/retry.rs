//! Retry utilities with exponential backoff.
//!
//! [`with_retry`] retries every failure; [`with_retry_if`] lets the caller
//! stop early on failures that cannot succeed on a second attempt. The
//! status classification below is what the weather provider uses for that
//! decision:
//! - Timeouts, connection failures, 5xx, 408 and 429 are retried
//! - Other 4xx (not found, bad key, bad request) are not

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

/// Default retry configuration
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_retries: u32,
    /// Initial delay between attempts (doubles each attempt)
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Calculate the delay that follows the given failed attempt (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // Exponential backoff: initial_delay * 2^attempt
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }

    /// Total attempts made before giving up; never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Should retry the request
    Retry,
    /// Should not retry - permanent failure
    NoRetry,
}

/// Check if a status code is retryable
pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status.is_server_error() {
        return RetryDecision::Retry;
    }

    // 429 Too Many Requests - should retry with backoff
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RetryDecision::Retry;
    }

    if status == StatusCode::REQUEST_TIMEOUT {
        return RetryDecision::Retry;
    }

    // Remaining 4xx, including 401 and 404, will fail again
    RetryDecision::NoRetry
}

/// Run `operation`, retrying every failure with exponential backoff.
///
/// The operation is invoked at most `config.attempts()` times. Between a
/// failed attempt `k` and the next one the helper sleeps
/// `initial_delay * 2^k`. The last error is returned once attempts run out.
///
/// # Errors
/// Returns the error of the final attempt.
///
/// # Example
/// ```ignore
/// let data = with_retry(&RetryConfig::default(), || async {
///     client.get(url).send().await?.error_for_status()
/// })
/// .await?;
/// ```
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    with_retry_if(config, operation, |_| true).await
}

/// Like [`with_retry`], but errors for which `should_retry` returns false
/// are returned immediately without further attempts.
///
/// # Errors
/// Returns the first non-retryable error, or the error of the final attempt.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    mut should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
    E: Display,
{
    let attempts = config.attempts();
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("Request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                if !should_retry(&e) {
                    tracing::debug!("Non-retryable error: {}", e);
                    return Err(e);
                }

                if attempt + 1 >= attempts {
                    tracing::error!("All {} attempts exhausted: {}", attempts, e);
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    "Attempt {} of {} failed ({}), retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(1000));
        assert_eq!(config.max_delay, Duration::from_millis(30_000));
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new(3, 100, 5000);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::new(10, 100, 1000);

        // 2^4 * 100 = 1600 > 1000
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        assert_eq!(RetryConfig::new(0, 100, 1000).attempts(), 1);
    }

    #[test]
    fn test_retryable_status_codes() {
        assert_eq!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::BAD_GATEWAY), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::REQUEST_TIMEOUT), RetryDecision::Retry);

        assert_eq!(is_retryable_status(StatusCode::BAD_REQUEST), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::UNAUTHORIZED), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::NOT_FOUND), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::OK), RetryDecision::NoRetry);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries_with_doubling_delays() {
        let config = RetryConfig::new(3, 1000, 30_000);
        let start = Instant::now();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let result: Result<(), String> = with_retry(&config, || {
            let calls = calls.clone();
            async move {
                calls.lock().unwrap().push(start.elapsed());
                Err("transient".to_string())
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "transient");
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        // Waits 1000ms after the first failure, 2000ms after the second
        assert_eq!(calls[0], Duration::ZERO);
        assert_eq!(calls[1], Duration::from_millis(1000));
        assert_eq!(calls[2], Duration::from_millis(3000));
        // No sleep after the final attempt
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_success() {
        let config = RetryConfig::new(3, 500, 30_000);
        let counter = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result: Result<u32, String> = with_retry(&config, || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err("flaky".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_does_not_sleep() {
        let start = Instant::now();
        let result: Result<&str, String> =
            with_retry(&RetryConfig::default(), || async { Ok("ok") }).await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result: Result<(), String> = with_retry_if(
            &RetryConfig::default(),
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("not found".to_string())
                }
            },
            |e| e != "not found",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
