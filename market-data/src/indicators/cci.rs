//! CCI (Commodity Channel Index) indicator

use super::{ensure_period, ensure_points, last_output, ta_build, Indicator, IndicatorError};
use crate::data::CandleSeries;
use ta::indicators::{MeanAbsoluteDeviation, SimpleMovingAverage};

const NAME: &str = "cci";
/// Lambert's constant, scales most readings into [-100, 100]
const SCALE: f64 = 0.015;

#[derive(Debug, Clone, Copy)]
pub struct Cci {
    period: usize,
}

impl Cci {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Cci {
    type Output = f64;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.period
    }

    fn calculate(&self, series: &CandleSeries) -> Result<f64, IndicatorError> {
        calculate_cci(&series.typical_prices(), self.period)
    }
}

/// CCI of the latest typical price `(H + L + C) / 3`. Zero deviation reads 0.
///
/// `ta`'s own `CommodityChannelIndex` measures deviation on closes, so the
/// mean and deviation are both taken over typical prices here.
pub fn calculate_cci(typical_prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    ensure_period(NAME, "period", period)?;
    ensure_points(NAME, period, typical_prices.len())?;

    let window = &typical_prices[typical_prices.len() - period..];
    let mut sma = ta_build(NAME, "period", SimpleMovingAverage::new(period))?;
    let mut mad = ta_build(NAME, "period", MeanAbsoluteDeviation::new(period))?;
    let (Some(mean), Some(deviation)) = (last_output(&mut sma, window), last_output(&mut mad, window)) else {
        return Ok(0.0);
    };
    if deviation == 0.0 {
        return Ok(0.0);
    }
    Ok((window[period - 1] - mean) / (SCALE * deviation))
}
