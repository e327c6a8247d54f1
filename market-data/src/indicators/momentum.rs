//! Price momentum as a ratio

use super::{ensure_period, ensure_points, last_output, ta_build, Indicator, IndicatorError};
use crate::data::CandleSeries;
use ta::indicators::RateOfChange;

const NAME: &str = "momentum";

#[derive(Debug, Clone, Copy)]
pub struct Momentum {
    period: usize,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Momentum {
    type Output = f64;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, series: &CandleSeries) -> Result<f64, IndicatorError> {
        calculate_momentum(&series.closes(), self.period)
    }
}

/// `close / close[-period] * 100`; 100 means unchanged
pub fn calculate_momentum(closes: &[f64], period: usize) -> Result<f64, IndicatorError> {
    ensure_period(NAME, "period", period)?;
    ensure_points(NAME, period + 1, closes.len())?;

    if closes[closes.len() - 1 - period] == 0.0 {
        return Err(IndicatorError::Undefined {
            indicator: NAME,
            reason: "reference close is zero".to_string(),
        });
    }
    // rate of change is the percentage move; momentum is that move above 100
    let mut roc = ta_build(NAME, "period", RateOfChange::new(period))?;
    let change = last_output(&mut roc, &closes[closes.len() - 1 - period..]).unwrap_or(0.0);
    Ok(change + 100.0)
}
