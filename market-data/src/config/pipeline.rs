//! Pipeline-wide configuration

use super::SourceConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration passed explicitly into the store, sources and manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub binance: SourceConfig,
    pub okx: SourceConfig,
    pub coingecko: SourceConfig,
    /// Per-request HTTP timeout, in seconds
    pub request_timeout_secs: u64,
    /// Fraction of expected candles the cache must hold to skip a refetch
    pub sufficiency_ratio: f64,
    /// Rows older than this are removed by the retention sweep
    pub retention_days: i64,
    /// Minimum candles an analysis request needs overall
    pub min_analysis_candles: usize,
    /// Quote currency appended to bare tickers (e.g., "BTC" -> "BTC/USDT")
    pub default_quote: String,
    /// Overall time allowed for walking the source list, in seconds
    #[serde(default)]
    pub fetch_budget_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            binance: SourceConfig::binance(),
            okx: SourceConfig::okx(),
            coingecko: SourceConfig::coingecko(),
            request_timeout_secs: 30,
            sufficiency_ratio: 0.8,
            retention_days: 90,
            min_analysis_candles: 20,
            default_quote: "USDT".to_string(),
            fetch_budget_secs: None,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by the environment-level settings
    pub fn from_shared(config: &shared::Config) -> Self {
        let mut pipeline = Self {
            request_timeout_secs: config.request_timeout_secs,
            sufficiency_ratio: config.sufficiency_ratio,
            retention_days: config.retention_days,
            default_quote: config.default_quote.clone(),
            fetch_budget_secs: config.fetch_budget_secs,
            ..Self::default()
        };
        for source in [&mut pipeline.binance, &mut pipeline.okx, &mut pipeline.coingecko] {
            source.retry.max_attempts = config.retry_attempts.max(1);
        }
        pipeline
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_budget(&self) -> Option<Duration> {
        self.fetch_budget_secs.map(Duration::from_secs)
    }
}
