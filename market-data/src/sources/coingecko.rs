//! CoinGecko market charts
//!
//! CoinGecko only returns price ticks, not bars, so ticks are folded into
//! UTC-day candles. Finer granularity is refused outright.

use super::http::{decode, HttpSource};
use super::DataSource;
use crate::config::SourceConfig;
use crate::data::{split_pair, Candle, CandleSeries, Interval};
use crate::error::{SourceError, SourceErrorKind};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{instrument, warn};

const NAME: &str = "CoinGecko";
const DAY: i64 = 86_400;

const COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("LINK", "chainlink"),
    ("LTC", "litecoin"),
    ("XRP", "ripple"),
    ("BNB", "binancecoin"),
    ("SOL", "solana"),
    ("MATIC", "matic-network"),
    ("AVAX", "avalanche-2"),
    ("DOGE", "dogecoin"),
    ("SHIB", "shiba-inu"),
    ("UNI", "uniswap"),
    ("ATOM", "cosmos"),
];

/// `/market_chart/range` payload; each point is `[ms, value]`
#[derive(Debug, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<(f64, f64)>,
    #[serde(default)]
    pub total_volumes: Vec<(f64, f64)>,
}

pub struct CoinGeckoSource {
    http: HttpSource,
    default_quote: String,
}

impl CoinGeckoSource {
    pub fn new(config: &SourceConfig, timeout: Duration, default_quote: &str) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpSource::new(NAME, config, timeout)?,
            default_quote: default_quote.to_string(),
        })
    }

    pub fn coin_id(base: &str) -> Option<&'static str> {
        COIN_IDS
            .iter()
            .find(|(ticker, _)| ticker.eq_ignore_ascii_case(base))
            .map(|(_, id)| *id)
    }

    /// Stablecoin quotes are priced in USD
    pub fn vs_currency(quote: &str) -> String {
        match quote.to_uppercase().as_str() {
            "USDT" | "USDC" | "BUSD" | "USD" => "usd".to_string(),
            other => other.to_lowercase(),
        }
    }

    async fn fetch_chart(&self, coin_id: &str, vs_currency: &str, start: i64, end: i64) -> Result<MarketChart, SourceError> {
        let query = [
            ("vs_currency", vs_currency.to_string()),
            ("from", start.to_string()),
            ("to", end.to_string()),
        ];
        let path = format!("/coins/{}/market_chart/range", coin_id);
        let reply = self.http.get_json(&path, &query).await?;
        if !reply.is_success() {
            return Err(self.http.error(SourceErrorKind::Status(reply.status)));
        }
        if let Some(err) = reply.body.get("error") {
            return Err(self.http.error(SourceErrorKind::Provider(err.to_string())));
        }
        decode(NAME, reply.body)
    }
}

#[async_trait]
impl DataSource for CoinGeckoSource {
    fn name(&self) -> &str {
        NAME
    }

    fn supports(&self, interval: Interval) -> bool {
        interval == Interval::OneDay
    }

    #[instrument(skip(self), fields(source = NAME))]
    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: i64,
        end: i64,
    ) -> Result<CandleSeries, SourceError> {
        if !self.supports(interval) {
            return Err(SourceError::unsupported(
                NAME,
                format!("unsupported interval for source: {}", interval),
            ));
        }

        let (base, quote) = split_pair(symbol, &self.default_quote);
        let coin_id = Self::coin_id(&base)
            .ok_or_else(|| SourceError::unsupported(NAME, format!("unknown coin: {}", base)))?;
        let vs_currency = Self::vs_currency(&quote);

        let chart = self
            .http
            .retry
            .run(|_| self.fetch_chart(coin_id, &vs_currency, start, end))
            .await?;

        let candles = daily_candles(&chart, symbol);
        Ok(CandleSeries::from_unsorted(candles).clamp(start, end))
    }
}

#[derive(Debug)]
struct DayBucket {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Fold price ticks into UTC-day candles. Volume is the last 24h volume
/// reported within the day.
pub fn daily_candles(chart: &MarketChart, symbol: &str) -> Vec<Candle> {
    let day_of = |ms: f64| {
        let ts = ms as i64 / 1000;
        ts - ts.rem_euclid(DAY)
    };

    let mut days: BTreeMap<i64, DayBucket> = BTreeMap::new();
    for &(ms, price) in &chart.prices {
        if !price.is_finite() {
            warn!(source = NAME, %symbol, ms, "dropping non-finite price tick");
            continue;
        }
        days.entry(day_of(ms))
            .and_modify(|b| {
                b.high = b.high.max(price);
                b.low = b.low.min(price);
                b.close = price;
            })
            .or_insert(DayBucket {
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 0.0,
            });
    }

    for &(ms, volume) in &chart.total_volumes {
        if let Some(bucket) = days.get_mut(&day_of(ms)) {
            bucket.volume = volume;
        }
    }

    days.into_iter()
        .map(|(day, b)| Candle::new(symbol, day, b.open, b.high, b.low, b.close, b.volume, Interval::OneDay, NAME))
        .filter(Candle::is_valid)
        .collect()
}
