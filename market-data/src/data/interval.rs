//! Candle intervals and lookback periods

use crate::error::MarketDataError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Bucket width of a candle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
}

impl Interval {
    pub const ALL: [Interval; 7] = [
        Interval::OneMinute,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::OneHour,
        Interval::FourHours,
        Interval::OneDay,
        Interval::OneWeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
        }
    }

    /// Width of one bucket in seconds
    pub fn seconds(&self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::FiveMinutes => 300,
            Self::FifteenMinutes => 900,
            Self::OneHour => 3_600,
            Self::FourHours => 14_400,
            Self::OneDay => 86_400,
            Self::OneWeek => 604_800,
        }
    }
}

impl FromStr for Interval {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s.trim())
            .ok_or_else(|| {
                MarketDataError::validation(
                    "timeframe",
                    s,
                    "expected one of 1m, 5m, 15m, 1h, 4h, 1d, 1w",
                )
            })
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative lookback window ending "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::OneDay,
        Period::SevenDays,
        Period::ThirtyDays,
        Period::NinetyDays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::NinetyDays => "90d",
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            Self::OneDay => chrono::Duration::days(1),
            Self::SevenDays => chrono::Duration::days(7),
            Self::ThirtyDays => chrono::Duration::days(30),
            Self::NinetyDays => chrono::Duration::days(90),
        }
    }

    /// `[start, end]` in unix seconds for a window ending at `end`
    pub fn range_ending_at(&self, end: i64) -> (i64, i64) {
        (end - self.duration().num_seconds(), end)
    }
}

impl FromStr for Period {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| {
                MarketDataError::validation("period", s, "expected one of 1d, 7d, 30d, 90d")
            })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_parsing() {
        assert_eq!("1h".parse::<Interval>().unwrap(), Interval::OneHour);
        assert_eq!("1w".parse::<Interval>().unwrap().seconds(), 604_800);
        assert!(matches!(
            "2h".parse::<Interval>(),
            Err(MarketDataError::Validation { field: "timeframe", .. })
        ));
    }

    #[test]
    fn test_period_range() {
        let period: Period = "30d".parse().unwrap();
        assert_eq!(period.range_ending_at(2_592_000), (0, 2_592_000));
        assert!("14d".parse::<Period>().is_err());
    }
}
