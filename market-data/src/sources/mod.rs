//! Upstream OHLCV providers
//!
//! Each provider implements [`DataSource`]; [`SourceRegistry`] tries them in
//! priority order. Requests to one provider are paced by its own [`RateGate`]
//! and retried by its own [`RetryPolicy`].

pub mod binance;
pub mod coingecko;
pub(crate) mod http;
pub mod okx;
pub mod rate_limit;
pub mod registry;
pub mod retry;

pub use binance::BinanceSource;
pub use coingecko::CoinGeckoSource;
pub use okx::OkxSource;
pub use rate_limit::RateGate;
pub use registry::SourceRegistry;
pub use retry::RetryPolicy;

use crate::data::{CandleSeries, Interval};
use crate::error::SourceError;
use async_trait::async_trait;

/// A provider of historical candles
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Provider name, stamped on every candle it returns
    fn name(&self) -> &str;

    /// Whether the provider can serve `interval` at all
    fn supports(&self, _interval: Interval) -> bool {
        true
    }

    /// Candles with `start <= timestamp <= end` (unix seconds), ordered and
    /// deduplicated. An empty series means the provider had nothing to offer.
    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: i64,
        end: i64,
    ) -> Result<CandleSeries, SourceError>;
}
