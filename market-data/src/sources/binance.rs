//! Binance spot klines

use super::http::{decode, parse_price, HttpSource};
use super::DataSource;
use crate::config::SourceConfig;
use crate::data::{split_pair, Candle, CandleSeries, Interval};
use crate::error::{SourceError, SourceErrorKind};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const NAME: &str = "Binance";
/// Maximum klines per request
const PAGE_LIMIT: i64 = 1000;
/// "Invalid symbol." and "Invalid interval." error codes
const UNSUPPORTED_CODES: [i64; 2] = [-1121, -1120];

/// One `/klines` row:
/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume, trades, takerBase, takerQuote, ignore]`
#[derive(Debug, Deserialize)]
struct KlineRow(
    i64,
    String,
    String,
    String,
    String,
    String,
    #[allow(dead_code)] i64,
    #[allow(dead_code)] String,
    #[allow(dead_code)] u64,
    #[allow(dead_code)] String,
    #[allow(dead_code)] String,
    #[allow(dead_code)] String,
);

impl KlineRow {
    fn into_candle(self, symbol: &str, interval: Interval) -> Option<Candle> {
        Some(Candle::new(
            symbol,
            self.0 / 1000,
            parse_price(&self.1)?,
            parse_price(&self.2)?,
            parse_price(&self.3)?,
            parse_price(&self.4)?,
            parse_price(&self.5)?,
            interval,
            NAME,
        ))
    }
}

/// Error payload: `{"code": -1121, "msg": "Invalid symbol."}`
#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    #[serde(default)]
    msg: String,
}

pub struct BinanceSource {
    http: HttpSource,
    default_quote: String,
}

impl BinanceSource {
    pub fn new(config: &SourceConfig, timeout: Duration, default_quote: &str) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpSource::new(NAME, config, timeout)?,
            default_quote: default_quote.to_string(),
        })
    }

    /// `BTC/USDT` -> `BTCUSDT`
    pub fn market_symbol(&self, symbol: &str) -> String {
        let (base, quote) = split_pair(symbol, &self.default_quote);
        format!("{}{}", base, quote)
    }

    pub fn interval_code(interval: Interval) -> &'static str {
        // Binance uses the same vocabulary as the pipeline
        interval.as_str()
    }

    /// Klines opened within `[start_ms, end_ms]`, oldest first
    async fn fetch_page(
        &self,
        market: &str,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Value, SourceError> {
        let query = [
            ("symbol", market.to_string()),
            ("interval", Self::interval_code(interval).to_string()),
            ("startTime", start_ms.to_string()),
            ("endTime", end_ms.to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        let reply = self.http.get_json("/klines", &query).await?;
        if reply.is_success() && reply.body.is_array() {
            Ok(reply.body)
        } else {
            Err(classify_error(reply.status, &reply.body))
        }
    }
}

#[async_trait]
impl DataSource for BinanceSource {
    fn name(&self) -> &str {
        NAME
    }

    /// Pages walk backwards from `end`, each window holding at most one
    /// page of bars, so a capped fetch keeps the most recent ones.
    #[instrument(skip(self), fields(source = NAME))]
    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: i64,
        end: i64,
    ) -> Result<CandleSeries, SourceError> {
        let market = self.market_symbol(symbol);
        let step_ms = interval.seconds() * 1000;
        let start_ms = start * 1000;
        let mut window_end = end * 1000;
        let mut candles = Vec::new();
        let mut complete = false;

        for _ in 0..self.http.max_pages {
            let window_start = (window_end + 1 - PAGE_LIMIT * step_ms).max(start_ms);
            let body = self
                .http
                .retry
                .run(|_| self.fetch_page(&market, interval, window_start, window_end))
                .await?;

            let page = parse_klines(body, symbol, interval)?;
            let empty = page.is_empty();
            candles.extend(page);

            if empty || window_start <= start_ms {
                complete = true;
                break;
            }
            window_end = window_start - 1;
        }

        if !complete {
            debug!(%symbol, %interval, count = candles.len(), "page cap reached before range start");
        }
        Ok(CandleSeries::from_unsorted(candles).clamp(start, end))
    }
}

/// Map an error reply to a source error; symbol/interval rejections fail fast
pub fn classify_error(status: u16, body: &Value) -> SourceError {
    match serde_json::from_value::<ApiError>(body.clone()) {
        Ok(err) if UNSUPPORTED_CODES.contains(&err.code) => {
            SourceError::new(NAME, SourceErrorKind::Unsupported(err.msg))
        }
        Ok(err) if (200..300).contains(&status) => {
            SourceError::new(NAME, SourceErrorKind::Provider(format!("{}: {}", err.code, err.msg)))
        }
        Err(_) if (200..300).contains(&status) => {
            SourceError::new(NAME, SourceErrorKind::Parse("expected an array of klines".to_string()))
        }
        _ => SourceError::new(NAME, SourceErrorKind::Status(status)),
    }
}

/// Parse a `/klines` body, dropping rows that are malformed or break the
/// OHLC invariant.
pub fn parse_klines(body: Value, symbol: &str, interval: Interval) -> Result<Vec<Candle>, SourceError> {
    let rows: Vec<Value> = decode(NAME, body)?;

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let parsed = serde_json::from_value::<KlineRow>(row.clone())
            .ok()
            .and_then(|kline| kline.into_candle(symbol, interval));

        match parsed {
            Some(candle) if candle.is_valid() => candles.push(candle),
            _ => warn!(source = NAME, %symbol, ?row, "dropping malformed kline"),
        }
    }
    Ok(candles)
}
