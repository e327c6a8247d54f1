//! Technical indicators module
//!
//! Every indicator is a pure function of a candle series and its parameters.
//! Windowed statistics are streamed through `ta` indicators; [`math`] holds
//! the few that `ta` computes differently. [`IndicatorEngine`] runs a batch
//! of them and records the ones that could not be computed.

pub mod bb;
pub mod cci;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod math;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod williams;

pub use bb::*;
pub use cci::*;
pub use ema::*;
pub use engine::*;
pub use macd::*;
pub use momentum::*;
pub use rsi::*;
pub use sma::*;
pub use stochastic::*;
pub use williams::*;

use crate::data::CandleSeries;
use crate::error::MarketDataError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ta::Next;
use thiserror::Error;

/// Indicator trait for all indicators
pub trait Indicator {
    type Output;

    /// Get the name of the indicator
    fn name(&self) -> &'static str;

    /// Fewest candles the calculation accepts
    fn min_points(&self) -> usize;

    /// Value at the most recent candle
    fn calculate(&self, series: &CandleSeries) -> Result<Self::Output, IndicatorError>;
}

/// Why one indicator could not be computed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("{indicator} needs at least {required} candles, have {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    #[error("{indicator}: invalid parameter: {reason}")]
    InvalidParameter { indicator: &'static str, reason: String },

    #[error("{indicator} is undefined for this series: {reason}")]
    Undefined { indicator: &'static str, reason: String },
}

impl From<IndicatorError> for MarketDataError {
    fn from(err: IndicatorError) -> Self {
        match err {
            IndicatorError::InsufficientData {
                indicator,
                required,
                available,
            } => MarketDataError::InsufficientData {
                scope: crate::error::DataScope::Indicator(indicator.to_string()),
                required,
                available,
            },
            IndicatorError::InvalidParameter { indicator, reason } => {
                MarketDataError::validation("params", indicator, reason)
            }
            // the series itself cannot feed this indicator
            IndicatorError::Undefined { indicator, reason } => {
                MarketDataError::validation("series", indicator, reason)
            }
        }
    }
}

/// Fail with `InsufficientData` unless `available >= required`
pub(crate) fn ensure_points(indicator: &'static str, required: usize, available: usize) -> Result<(), IndicatorError> {
    if available < required {
        return Err(IndicatorError::InsufficientData {
            indicator,
            required,
            available,
        });
    }
    Ok(())
}

pub(crate) fn ensure_period(indicator: &'static str, name: &str, value: usize) -> Result<(), IndicatorError> {
    if value == 0 {
        return Err(IndicatorError::InvalidParameter {
            indicator,
            reason: format!("{} must be positive", name),
        });
    }
    Ok(())
}

/// Construct a `ta` indicator, reporting a rejected period against `indicator`
pub(crate) fn ta_build<T>(indicator: &'static str, name: &str, built: ta::errors::Result<T>) -> Result<T, IndicatorError> {
    built.map_err(|e| IndicatorError::InvalidParameter {
        indicator,
        reason: format!("{}: {}", name, e),
    })
}

/// Feed every value through `inner` and keep its last output
pub(crate) fn last_output<I>(inner: &mut I, values: &[f64]) -> Option<f64>
where
    I: Next<f64, Output = f64>,
{
    values.iter().fold(None, |_, &value| Some(inner.next(value)))
}

/// The nine supported indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Rsi,
    Macd,
    BollingerBands,
    Sma,
    Ema,
    Stochastic,
    WilliamsR,
    Cci,
    Momentum,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 9] = [
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::BollingerBands,
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Stochastic,
        IndicatorKind::WilliamsR,
        IndicatorKind::Cci,
        IndicatorKind::Momentum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsi => "rsi",
            Self::Macd => "macd",
            Self::BollingerBands => "bollinger_bands",
            Self::Sma => "sma",
            Self::Ema => "ema",
            Self::Stochastic => "stochastic",
            Self::WilliamsR => "williams_r",
            Self::Cci => "cci",
            Self::Momentum => "momentum",
        }
    }

    /// Parse a comma separated list, e.g. `"rsi, macd"`. Duplicates collapse.
    pub fn parse_list(raw: &str) -> Result<Vec<IndicatorKind>, MarketDataError> {
        let mut kinds = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind: IndicatorKind = name.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl FromStr for IndicatorKind {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| MarketDataError::validation("indicators", s, "unknown indicator"))
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
