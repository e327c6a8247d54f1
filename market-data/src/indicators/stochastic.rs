//! Stochastic oscillator

use super::{ensure_period, ensure_points, last_output, ta_build, Indicator, IndicatorError};
use crate::data::CandleSeries;
use serde::{Deserialize, Serialize};
use ta::indicators::{FastStochastic, SimpleMovingAverage};
use ta::{Close, High, Low, Next};

const NAME: &str = "stochastic";

#[derive(Debug, Clone, Copy)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Self {
        Self { k_period, d_period }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
}

impl Indicator for Stochastic {
    type Output = StochasticValue;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.k_period + self.d_period
    }

    fn calculate(&self, series: &CandleSeries) -> Result<StochasticValue, IndicatorError> {
        calculate_stochastic(
            &series.highs(),
            &series.lows(),
            &series.closes(),
            self.k_period,
            self.d_period,
        )
    }
}

/// `%K` of the latest bar and `%D`, the mean of the last `d_period` `%K`
/// values. A window with no range reads 50.
pub fn calculate_stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> Result<StochasticValue, IndicatorError> {
    ensure_period(NAME, "k_period", k_period)?;
    ensure_period(NAME, "d_period", d_period)?;
    let available = closes.len().min(highs.len()).min(lows.len());
    ensure_points(NAME, k_period + d_period, available)?;

    let mut fast = ta_build(NAME, "k_period", FastStochastic::new(k_period))?;
    let k_values: Vec<f64> = (0..available)
        .map(|i| {
            let bar = Hlc {
                high: highs[i],
                low: lows[i],
                close: closes[i],
            };
            fast.next(&bar).clamp(0.0, 100.0)
        })
        .collect();

    // %K windows are complete for the last `d_period` bars
    let recent = &k_values[available - d_period..];
    let mut d_sma = ta_build(NAME, "d_period", SimpleMovingAverage::new(d_period))?;
    let d = last_output(&mut d_sma, recent).unwrap_or(50.0);
    let k = recent.last().copied().unwrap_or(50.0);
    Ok(StochasticValue { k, d })
}

/// One bar as `ta` reads it
struct Hlc {
    high: f64,
    low: f64,
    close: f64,
}

impl High for Hlc {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for Hlc {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for Hlc {
    fn close(&self) -> f64 {
        self.close
    }
}
