//! OKX history candles

use super::http::{decode, parse_price, HttpSource};
use super::DataSource;
use crate::config::SourceConfig;
use crate::data::{split_pair, Candle, CandleSeries, Interval};
use crate::error::{SourceError, SourceErrorKind};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{instrument, warn};

const NAME: &str = "OKX";
const PAGE_LIMIT: usize = 100;
/// "Instrument ID does not exist" and "Instrument ID or Spread ID doesn't exist"
const UNSUPPORTED_CODES: [&str; 2] = ["51001", "51000"];

/// Every OKX reply: `{"code": "0", "msg": "", "data": [...]}`
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    /// `["ts(ms)", "o", "h", "l", "c", "vol", "volCcy", "volCcyQuote", "confirm"]`
    #[serde(default)]
    pub data: Vec<Vec<String>>,
}

pub struct OkxSource {
    http: HttpSource,
    default_quote: String,
}

impl OkxSource {
    pub fn new(config: &SourceConfig, timeout: Duration, default_quote: &str) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpSource::new(NAME, config, timeout)?,
            default_quote: default_quote.to_string(),
        })
    }

    /// `BTC/USDT` -> `BTC-USDT`
    pub fn market_symbol(&self, symbol: &str) -> String {
        let (base, quote) = split_pair(symbol, &self.default_quote);
        format!("{}-{}", base, quote)
    }

    /// OKX bars; daily and weekly use the UTC-aligned variants
    pub fn interval_code(interval: Interval) -> &'static str {
        match interval {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "1H",
            Interval::FourHours => "4H",
            Interval::OneDay => "1Dutc",
            Interval::OneWeek => "1Wutc",
        }
    }

    /// One page of bars strictly older than `after_ms` and newer than `before_ms`
    async fn fetch_page(
        &self,
        market: &str,
        interval: Interval,
        after_ms: i64,
        before_ms: i64,
    ) -> Result<Vec<Vec<String>>, SourceError> {
        let query = [
            ("instId", market.to_string()),
            ("bar", Self::interval_code(interval).to_string()),
            ("after", after_ms.to_string()),
            ("before", before_ms.to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        let reply = self.http.get_json("/market/history-candles", &query).await?;
        let success = reply.is_success();
        let status_error = SourceError::new(NAME, SourceErrorKind::Status(reply.status));
        let envelope = match decode::<Envelope>(NAME, reply.body) {
            Ok(envelope) => envelope,
            Err(_) if !success => return Err(status_error),
            Err(e) => return Err(e),
        };
        // error replies usually carry a code worth classifying
        let data = check_envelope(envelope)?;
        if !success {
            return Err(status_error);
        }
        Ok(data)
    }
}

#[async_trait]
impl DataSource for OkxSource {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self), fields(source = NAME))]
    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: i64,
        end: i64,
    ) -> Result<CandleSeries, SourceError> {
        let market = self.market_symbol(symbol);
        let before_ms = start * 1000 - 1;
        let mut after_ms = end * 1000 + 1;
        let mut candles = Vec::new();

        // pages walk backwards from `end`
        for _ in 0..self.http.max_pages {
            let data = self
                .http
                .retry
                .run(|_| self.fetch_page(&market, interval, after_ms, before_ms))
                .await?;

            let rows = data.len();
            let page = parse_candles(data, symbol, interval);
            let oldest = page.iter().map(|c| c.timestamp).min();
            candles.extend(page);

            match oldest {
                Some(ts) if rows >= PAGE_LIMIT && ts > start => after_ms = ts * 1000,
                _ => break,
            }
        }

        Ok(CandleSeries::from_unsorted(candles).clamp(start, end))
    }
}

/// Unwrap the envelope, turning provider codes into errors
pub fn check_envelope(envelope: Envelope) -> Result<Vec<Vec<String>>, SourceError> {
    let Envelope { code, msg, data } = envelope;
    match code.as_str() {
        "0" => Ok(data),
        c if UNSUPPORTED_CODES.contains(&c) => Err(SourceError::new(
            NAME,
            SourceErrorKind::Unsupported(format!("{}: {}", c, msg)),
        )),
        c => Err(SourceError::new(
            NAME,
            SourceErrorKind::Provider(format!("{}: {}", c, msg)),
        )),
    }
}

/// Parse `data` rows, which arrive newest first. Short or non-numeric rows
/// and rows breaking the OHLC invariant are dropped.
pub fn parse_candles(rows: Vec<Vec<String>>, symbol: &str, interval: Interval) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let parsed = match row.as_slice() {
            [ts, open, high, low, close, volume, ..] => (|| {
                Some(Candle::new(
                    symbol,
                    ts.parse::<i64>().ok()? / 1000,
                    parse_price(open)?,
                    parse_price(high)?,
                    parse_price(low)?,
                    parse_price(close)?,
                    parse_price(volume)?,
                    interval,
                    NAME,
                ))
            })(),
            _ => None,
        };

        match parsed {
            Some(candle) if candle.is_valid() => candles.push(candle),
            _ => warn!(source = NAME, %symbol, ?row, "dropping malformed candle"),
        }
    }
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::http::testing;
    use axum::extract::{Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const HOUR_MS: i64 = 3_600_000;

    fn envelope(body: Value) -> Envelope {
        serde_json::from_value(body).unwrap()
    }

    /// Hourly bars strictly between `before` and `after`, newest first
    async fn history_candles(
        State(calls): State<Arc<AtomicUsize>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        calls.fetch_add(1, Ordering::SeqCst);
        let param = |name: &str| params.get(name).and_then(|v| v.parse::<i64>().ok()).unwrap();
        let (after, before, limit) = (param("after"), param("before"), param("limit"));

        let newest = (after - 1) - (after - 1).rem_euclid(HOUR_MS);
        let rows: Vec<Value> = (0..limit)
            .map(|i| newest - i * HOUR_MS)
            .take_while(|ts| *ts > before)
            .map(|ts| json!([ts.to_string(), "10", "12", "9", "11", "3", "30", "30", "1"]))
            .collect();
        Json(json!({"code": "0", "msg": "", "data": rows}))
    }

    async fn source(max_pages: usize) -> (OkxSource, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/market/history-candles", get(history_candles))
            .with_state(calls.clone());
        let base_url = testing::serve(router).await;
        let source = OkxSource::new(&testing::config(base_url, max_pages), Duration::from_secs(5), "USDT").unwrap();
        (source, calls)
    }

    #[test]
    fn test_symbol_and_interval_vocabulary() {
        let source = OkxSource::new(&SourceConfig::okx(), Duration::from_secs(5), "USDT").unwrap();
        assert_eq!(source.market_symbol("BTC/USDT"), "BTC-USDT");
        assert_eq!(source.market_symbol("SOL"), "SOL-USDT");
        assert_eq!(OkxSource::interval_code(Interval::OneHour), "1H");
        assert_eq!(OkxSource::interval_code(Interval::OneDay), "1Dutc");
    }

    #[test]
    fn test_parse_envelope_and_rows() {
        let body = envelope(json!({
            "code": "0",
            "msg": "",
            "data": [
                ["1700003600000", "105", "108", "101", "102", "8", "800", "800", "1"],
                ["1700000000000", "100", "110", "95", "105", "12.5", "1250", "1250", "1"],
                ["1699996400000", "100"]
            ]
        }));

        let data = check_envelope(body).unwrap();
        let candles = parse_candles(data, "BTC/USDT", Interval::OneHour);
        assert_eq!(candles.len(), 2);

        let series = CandleSeries::from_unsorted(candles);
        assert_eq!(series.candles()[0].timestamp, 1_700_000_000);
        assert_eq!(series.last().map(|c| c.close), Some(102.0));
    }

    #[test]
    fn test_provider_error_codes() {
        let missing = check_envelope(envelope(json!({"code": "51001", "msg": "Instrument ID does not exist", "data": []})));
        assert!(!missing.unwrap_err().is_retryable());

        let busy = check_envelope(envelope(json!({"code": "50011", "msg": "Too Many Requests"})));
        let err = busy.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err.kind, SourceErrorKind::Provider(_)));
    }

    #[tokio::test]
    async fn test_pages_walk_back_to_range_start() {
        let (source, calls) = source(30).await;
        let end = 1_700_002_800;
        let start = end - 250 * 3600;

        let series = source.fetch("BTC", Interval::OneHour, start, end).await.unwrap();

        assert_eq!(series.len(), 251);
        assert_eq!(series.candles()[0].timestamp, start);
        assert_eq!(series.last().map(|c| c.timestamp), Some(end));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_page_cap_keeps_the_newest_bars() {
        let (source, calls) = source(2).await;
        let end = 1_700_002_800;

        let series = source.fetch("BTC", Interval::OneHour, end - 250 * 3600, end).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(series.len(), 200);
        assert_eq!(series.last().map(|c| c.timestamp), Some(end));
    }
}
