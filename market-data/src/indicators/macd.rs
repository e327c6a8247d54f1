//! MACD (Moving Average Convergence Divergence) indicator

use super::math::ewm_mean;
use super::{ensure_period, ensure_points, Indicator, IndicatorError};
use crate::data::CandleSeries;
use serde::{Deserialize, Serialize};

const NAME: &str = "macd";

#[derive(Debug, Clone, Copy)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
        }
    }
}

/// MACD result structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Indicator for Macd {
    type Output = MacdValue;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.slow_period + self.signal_period
    }

    fn calculate(&self, series: &CandleSeries) -> Result<MacdValue, IndicatorError> {
        calculate_macd(&series.closes(), self.fast_period, self.slow_period, self.signal_period)
    }
}

/// MACD line, signal line and histogram at the latest close.
/// Needs `slow + signal` values.
pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdValue, IndicatorError> {
    ensure_period(NAME, "fast", fast)?;
    ensure_period(NAME, "slow", slow)?;
    ensure_period(NAME, "signal", signal)?;
    if fast >= slow {
        return Err(IndicatorError::InvalidParameter {
            indicator: NAME,
            reason: format!("fast period {} must be shorter than slow period {}", fast, slow),
        });
    }
    ensure_points(NAME, slow + signal, closes.len())?;

    let fast_ema = ewm_mean(closes, fast);
    let slow_ema = ewm_mean(closes, slow);
    let macd_line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ewm_mean(&macd_line, signal);

    // both lines are non-empty after ensure_points
    let macd = macd_line[macd_line.len() - 1];
    let signal = signal_line[signal_line.len() - 1];
    Ok(MacdValue {
        macd,
        signal,
        histogram: macd - signal,
    })
}
