//! OHLCV candle data structures

use super::Interval;
use serde::{Deserialize, Serialize};

/// OHLCV candle data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Symbol as requested by the caller (e.g., "BTC" or "BTC/USDT")
    pub symbol: String,
    /// Bar open time, unix seconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Volume
    pub volume: f64,
    /// Bucket width
    pub interval: Interval,
    /// Name of the provider that produced the bar
    pub source: String,
}

impl Candle {
    /// Create a new candle
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        interval: Interval,
        source: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            interval,
            source: source.into(),
        }
    }

    /// `low <= {open, close} <= high`, non-negative low and volume, all finite.
    pub fn is_valid(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.low >= 0.0
            && self.volume >= 0.0
            && self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
    }

    /// Get typical price (HLC/3)
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Ordered candles for one (symbol, interval), strictly increasing timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Create new empty series
    pub fn new() -> Self {
        Self {
            candles: Vec::new(),
        }
    }

    /// Build a series from candles in any order. When two candles share a
    /// timestamp the one appearing later in `candles` is kept.
    pub fn from_unsorted(mut candles: Vec<Candle>) -> Self {
        // stable sort keeps input order among equal timestamps
        candles.sort_by_key(|c| c.timestamp);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => deduped.push(candle),
            }
        }
        Self { candles: deduped }
    }

    /// Get number of candles
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Check if series is empty
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Get last candle
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Get all candles
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Keep only candles with `start <= timestamp <= end`
    pub fn clamp(self, start: i64, end: i64) -> Self {
        Self {
            candles: self
                .candles
                .into_iter()
                .filter(|c| c.timestamp >= start && c.timestamp <= end)
                .collect(),
        }
    }

    /// Get close prices as vector
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Get high prices as vector
    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    /// Get low prices as vector
    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    /// Get typical prices (HLC/3) as vector
    pub fn typical_prices(&self) -> Vec<f64> {
        self.candles.iter().map(Candle::typical_price).collect()
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::from_unsorted(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64, source: &str) -> Candle {
        Candle::new("BTC", ts, close, close + 1.0, close - 1.0, close, 10.0, Interval::OneHour, source)
    }

    #[test]
    fn test_series_sorted_and_deduplicated() {
        let series = CandleSeries::from_unsorted(vec![
            candle(7200, 102.0, "Binance"),
            candle(0, 100.0, "Binance"),
            candle(3600, 101.0, "Binance"),
            candle(3600, 111.0, "OKX"),
        ]);

        let stamps: Vec<i64> = series.candles().iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![0, 3600, 7200]);
        assert_eq!(series.candles()[1].source, "OKX");
        assert_eq!(series.closes(), vec![100.0, 111.0, 102.0]);
    }

    #[test]
    fn test_candle_invariant() {
        assert!(candle(0, 100.0, "Binance").is_valid());

        let mut broken = candle(0, 100.0, "Binance");
        broken.high = 99.0;
        assert!(!broken.is_valid());

        let mut negative = candle(0, 0.5, "Binance");
        negative.low = -0.5;
        assert!(!negative.is_valid());
    }

    #[test]
    fn test_clamp() {
        let series = CandleSeries::from_unsorted((0..10).map(|i| candle(i * 60, 1.0, "x")).collect());
        let clamped = series.clamp(120, 300);
        assert_eq!(clamped.len(), 4);
    }
}
