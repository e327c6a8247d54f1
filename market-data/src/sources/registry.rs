//! Source registry - ordered fallback across providers

use super::{BinanceSource, CoinGeckoSource, DataSource, OkxSource};
use crate::config::PipelineConfig;
use crate::data::{CandleSeries, Interval};
use crate::error::SourceError;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Providers in priority order
pub struct SourceRegistry {
    sources: Vec<Arc<dyn DataSource>>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<Arc<dyn DataSource>>) -> Self {
        Self { sources }
    }

    /// Binance, then OKX, then CoinGecko
    pub fn from_config(config: &PipelineConfig) -> Result<Self, SourceError> {
        let timeout = config.request_timeout();
        let quote = config.default_quote.as_str();
        Ok(Self::new(vec![
            Arc::new(BinanceSource::new(&config.binance, timeout, quote)?),
            Arc::new(OkxSource::new(&config.okx, timeout, quote)?),
            Arc::new(CoinGeckoSource::new(&config.coingecko, timeout, quote)?),
        ]))
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// First non-empty series from the providers, in order. Failures and
    /// empty answers move on to the next provider; when every provider is
    /// exhausted the result is an empty series, never an error.
    pub async fn resolve(&self, symbol: &str, interval: Interval, start: i64, end: i64) -> CandleSeries {
        self.resolve_with_deadline(symbol, interval, start, end, None).await
    }

    /// Like [`resolve`](Self::resolve), but gives up once `deadline` passes.
    /// A fetch still in flight at the deadline is abandoned.
    pub async fn resolve_with_deadline(
        &self,
        symbol: &str,
        interval: Interval,
        start: i64,
        end: i64,
        deadline: Option<Instant>,
    ) -> CandleSeries {
        for source in &self.sources {
            let name = source.name();
            if !source.supports(interval) {
                debug!(source = name, %interval, "skipping source, interval not served");
                continue;
            }

            let fetch = source.fetch(symbol, interval, start, end);
            let outcome = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fetch).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(source = name, %symbol, %interval, "fetch budget exhausted");
                        break;
                    }
                },
                None => fetch.await,
            };

            match outcome {
                Ok(series) if !series.is_empty() => {
                    info!(source = name, %symbol, %interval, candles = series.len(), "fetched candles");
                    return series;
                }
                Ok(_) => warn!(source = name, %symbol, %interval, "source returned no candles"),
                Err(err) => warn!(source = name, %symbol, %interval, "source failed: {}", err.kind),
            }
        }

        warn!(%symbol, %interval, "all sources exhausted");
        CandleSeries::new()
    }
}
