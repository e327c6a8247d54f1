//! Bounded retry with exponential backoff

use crate::config::RetryConfig;
use crate::error::SourceError;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor: backoff_factor.max(1.0),
        }
    }

    /// Wait after the failed attempt `attempt` (0-based): `base * factor^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.mul_f64(self.backoff_factor.powi(attempt as i32))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up. `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, SourceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt + 1 >= self.max_attempts => {
                    error!(
                        source = %err.source_name,
                        attempts = self.max_attempts,
                        "all attempts failed: {}",
                        err.kind
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        source = %err.source_name,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, retrying: {}",
                        err.kind
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay(), config.backoff_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2), 2.0);
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(SourceError::new("OKX", SourceErrorKind::Status(503)))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::new("Binance", SourceErrorKind::Timeout)) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind, SourceErrorKind::Timeout);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unsupported_fails_fast() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60), 2.0);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::unsupported("CoinGecko", "interval 1h")) }
            })
            .await;

        assert!(!result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
