//! Historical data manager
//!
//! Resolution order for one request: local cache, then the network, then
//! whatever stale rows the cache still holds. Only when both the network and
//! the cache come back empty does the request fail.

use crate::config::PipelineConfig;
use crate::data::{canonical_pair, normalize_symbol, CandleSeries, CandleStore, Interval, Period};
use crate::error::MarketDataError;
use crate::sources::SourceRegistry;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

pub struct HistoricalDataManager {
    store: Arc<CandleStore>,
    registry: Arc<SourceRegistry>,
    fetch_budget: Option<Duration>,
    default_quote: String,
}

impl HistoricalDataManager {
    pub fn new(store: Arc<CandleStore>, registry: Arc<SourceRegistry>) -> Self {
        Self {
            store,
            registry,
            fetch_budget: None,
            default_quote: PipelineConfig::default().default_quote,
        }
    }

    pub fn from_config(store: Arc<CandleStore>, registry: Arc<SourceRegistry>, config: &PipelineConfig) -> Self {
        Self::new(store, registry)
            .with_fetch_budget(config.fetch_budget())
            .with_default_quote(&config.default_quote)
    }

    /// Upper bound on time spent walking the source list for one request
    pub fn with_fetch_budget(mut self, budget: Option<Duration>) -> Self {
        self.fetch_budget = budget;
        self
    }

    /// Quote given to bare tickers before they reach the cache
    pub fn with_default_quote(mut self, quote: &str) -> Self {
        self.default_quote = quote.to_uppercase();
        self
    }

    pub fn store(&self) -> &Arc<CandleStore> {
        &self.store
    }

    /// String-typed entry point: validates every argument before touching
    /// the cache or the network.
    pub async fn get_data(
        &self,
        symbol: &str,
        interval: &str,
        period: &str,
        force_refresh: bool,
    ) -> Result<CandleSeries> {
        let symbol = normalize_symbol(symbol)?;
        let interval: Interval = interval.parse()?;
        let period: Period = period.parse()?;
        self.get_candles(&symbol, interval, period, force_refresh).await
    }

    /// Candles for the `period` ending now
    pub async fn get_candles(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
        force_refresh: bool,
    ) -> Result<CandleSeries> {
        let now = chrono::Utc::now().timestamp();
        self.get_candles_ending_at(symbol, interval, period, now, force_refresh)
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_candles_ending_at(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
        end: i64,
        force_refresh: bool,
    ) -> Result<CandleSeries> {
        let (start, end) = period.range_ending_at(end);
        // every spelling of a market shares one cache entry
        let pair = canonical_pair(symbol, &self.default_quote);
        let pair = pair.as_str();

        let cached = if force_refresh {
            None
        } else {
            let cached = self.store.query(pair, interval, start, end).await.map_err(|e| {
                error!(%pair, %interval, "candle store read failed: {}", e);
                e
            })?;
            if self.store.is_sufficient(&cached, start, end, interval) {
                info!(%pair, %interval, count = cached.len(), "cache hit");
                return Ok(cached);
            }
            Some(cached)
        };

        let deadline = self
            .fetch_budget
            .map(|budget| tokio::time::Instant::now() + budget);
        let fetched = self
            .registry
            .resolve_with_deadline(pair, interval, start, end, deadline)
            .await;

        if !fetched.is_empty() {
            let written = self.store.upsert(&fetched).await.map_err(|e| {
                error!(%pair, %interval, "failed to cache fetched candles: {}", e);
                e
            })?;
            info!(%pair, %interval, count = written, "cache refreshed");
            // serve what the store now holds so repeated calls agree
            return Ok(self.store.query(pair, interval, start, end).await?);
        }

        let stale = match cached {
            Some(cached) => cached,
            None => self.store.query(pair, interval, start, end).await?,
        };
        if stale.is_empty() {
            error!(%pair, %interval, "no candles from any source and nothing cached");
            return Err(MarketDataError::HistoricalData {
                symbol: symbol.to_string(),
            });
        }

        warn!(%pair, %interval, count = stale.len(), "network unavailable, serving stale cache");
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;
    use crate::error::{SourceError, StoreError};
    use crate::sources::DataSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const END: i64 = 1_700_006_400;

    /// Serves a full hourly range, or nothing at all
    struct ScriptedSource {
        online: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        fn name(&self) -> &str {
            "Scripted"
        }

        async fn fetch(&self, symbol: &str, interval: Interval, start: i64, end: i64) -> std::result::Result<CandleSeries, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.online {
                return Ok(CandleSeries::new());
            }
            let step = interval.seconds();
            let first = start + (step - start.rem_euclid(step)) % step;
            Ok(CandleSeries::from_unsorted(
                (0..)
                    .map(|i| first + i * step)
                    .take_while(|ts| *ts <= end)
                    .map(|ts| Candle::new(symbol, ts, 100.0, 101.0, 99.0, 100.0, 1.0, interval, "Scripted"))
                    .collect(),
            ))
        }
    }

    async fn manager_with_pool(online: bool) -> (HistoricalDataManager, Arc<ScriptedSource>, shared::DbPool) {
        let config = PipelineConfig::default();
        let pool = shared::get_memory_pool().await.unwrap();
        let store = Arc::new(CandleStore::new(pool.clone(), &config).await.unwrap());
        let source = Arc::new(ScriptedSource {
            online,
            calls: AtomicUsize::new(0),
        });
        let registry = Arc::new(SourceRegistry::new(vec![source.clone()]));
        (HistoricalDataManager::from_config(store, registry, &config), source, pool)
    }

    async fn manager(online: bool) -> (HistoricalDataManager, Arc<ScriptedSource>) {
        let (manager, source, _) = manager_with_pool(online).await;
        (manager, source)
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let (manager, source) = manager(true).await;

        let first = manager
            .get_candles_ending_at("BTC", Interval::OneHour, Period::OneDay, END, false)
            .await
            .unwrap();
        let second = manager
            .get_candles_ending_at("BTC", Interval::OneHour, Period::OneDay, END, false)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 25);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_skips_cache() {
        let (manager, source) = manager(true).await;
        for _ in 0..2 {
            manager
                .get_candles_ending_at("BTC", Interval::OneHour, Period::OneDay, END, true)
                .await
                .unwrap();
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_everywhere_is_historical_data_error() {
        let (manager, _) = manager(false).await;
        let err = manager
            .get_candles_ending_at("BTC", Interval::OneHour, Period::ThirtyDays, END, false)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::HistoricalData { ref symbol } if symbol == "BTC"));
    }

    #[tokio::test]
    async fn test_stale_cache_served_when_offline() {
        let (manager, _) = manager(false).await;
        let few: Vec<Candle> = (0..5)
            .map(|i| Candle::new("BTC/USDT", END - i * 3600, 1.0, 1.0, 1.0, 1.0, 1.0, Interval::OneHour, "Binance"))
            .collect();
        manager.store().upsert(&few.into()).await.unwrap();

        let series = manager
            .get_candles_ending_at("BTC", Interval::OneHour, Period::OneDay, END, false)
            .await
            .unwrap();
        assert_eq!(series.len(), 5);
    }

    #[tokio::test]
    async fn test_get_data_validates_before_fetching() {
        let (manager, source) = manager(true).await;

        let err = manager.get_data("BTC", "2h", "1d", false).await.unwrap_err();
        assert!(matches!(err, MarketDataError::Validation { field: "timeframe", .. }));

        let err = manager.get_data("BTC", "1h", "14d", false).await.unwrap_err();
        assert!(matches!(err, MarketDataError::Validation { field: "period", .. }));

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ticker_spellings_share_the_cache() {
        let (manager, source) = manager(true).await;

        for symbol in ["BTC", "BTC/USDT", "BTCUSDT"] {
            let series = manager
                .get_candles_ending_at(symbol, Interval::OneHour, Period::OneDay, END, false)
                .await
                .unwrap();
            assert_eq!(series.candles()[0].symbol, "BTC/USDT");
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        let stats = manager.store().stats().await.unwrap();
        assert_eq!(stats.symbols.keys().collect::<Vec<_>>(), vec!["BTC/USDT"]);
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let (manager, source, pool) = manager_with_pool(true).await;
        pool.close().await;

        // failed read: no fallback to the network
        let err = manager
            .get_candles_ending_at("BTC", Interval::OneHour, Period::OneDay, END, false)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Store(StoreError::Database(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        // failed write after a successful fetch
        let err = manager
            .get_candles_ending_at("BTC", Interval::OneHour, Period::OneDay, END, true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORE_ERROR");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
