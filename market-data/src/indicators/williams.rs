//! Williams %R

use super::{ensure_period, ensure_points, last_output, ta_build, Indicator, IndicatorError};
use crate::data::CandleSeries;
use ta::indicators::{Maximum, Minimum};

const NAME: &str = "williams_r";

#[derive(Debug, Clone, Copy)]
pub struct WilliamsR {
    period: usize,
}

impl WilliamsR {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for WilliamsR {
    type Output = f64;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.period
    }

    fn calculate(&self, series: &CandleSeries) -> Result<f64, IndicatorError> {
        calculate_williams_r(&series.highs(), &series.lows(), &series.closes(), self.period)
    }
}

/// In `[-100, 0]`; -50 when the window has no range
pub fn calculate_williams_r(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Result<f64, IndicatorError> {
    ensure_period(NAME, "period", period)?;
    let available = closes.len().min(highs.len()).min(lows.len());
    ensure_points(NAME, period, available)?;

    let mut highest = ta_build(NAME, "period", Maximum::new(period))?;
    let mut lowest = ta_build(NAME, "period", Minimum::new(period))?;
    let close = closes[available - 1];
    let (Some(hh), Some(ll)) = (
        last_output(&mut highest, &highs[..available]),
        last_output(&mut lowest, &lows[..available]),
    ) else {
        return Ok(-50.0);
    };

    let range = hh - ll;
    if range == 0.0 {
        return Ok(-50.0);
    }
    Ok((-100.0 * (hh - close) / range).clamp(-100.0, 0.0))
}
