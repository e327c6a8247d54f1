//! Per-provider configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry discipline for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff_factor: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: base_delay.as_millis() as u64,
            backoff_factor: 2.0,
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Settings shared by every upstream provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// REST base url, without trailing slash
    pub base_url: String,
    /// Requests per minute allowed by the rate gate
    pub rate_limit_per_minute: u32,
    pub retry: RetryConfig,
    /// Upper bound on paginated requests per fetch
    pub max_pages: usize,
}

impl SourceConfig {
    pub fn binance() -> Self {
        Self {
            base_url: "https://api.binance.com/api/v3".to_string(),
            rate_limit_per_minute: 1200,
            retry: RetryConfig::new(3, Duration::from_secs(1)),
            max_pages: 10,
        }
    }

    pub fn okx() -> Self {
        Self {
            base_url: "https://www.okx.com/api/v5".to_string(),
            rate_limit_per_minute: 600,
            retry: RetryConfig::new(3, Duration::from_secs(1)),
            max_pages: 30,
        }
    }

    /// CoinGecko's public tier throttles hard, hence the slower gate and longer backoff
    pub fn coingecko() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            rate_limit_per_minute: 50,
            retry: RetryConfig::new(3, Duration::from_secs(2)),
            max_pages: 1,
        }
    }
}
