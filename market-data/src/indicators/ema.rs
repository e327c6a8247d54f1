//! EMA (Exponential Moving Average) indicator

use super::math::ewm_mean;
use super::sma::{moving_average_set, MovingAverages};
use super::{ensure_period, ensure_points, Indicator, IndicatorError};
use crate::data::CandleSeries;

const NAME: &str = "ema";

#[derive(Debug, Clone)]
pub struct Ema {
    periods: Vec<usize>,
}

impl Ema {
    pub fn new(periods: Vec<usize>) -> Self {
        Self { periods }
    }
}

impl Indicator for Ema {
    type Output = MovingAverages;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.periods.iter().copied().min().unwrap_or(1)
    }

    fn calculate(&self, series: &CandleSeries) -> Result<MovingAverages, IndicatorError> {
        calculate_ema_set(&series.closes(), &self.periods)
    }
}

/// Latest EMA with span `period`; the series must hold at least `period` values
pub fn calculate_ema(values: &[f64], period: usize) -> Result<f64, IndicatorError> {
    ensure_period(NAME, "period", period)?;
    ensure_points(NAME, period, values.len())?;
    ewm_mean(values, period)
        .last()
        .copied()
        .ok_or(IndicatorError::InsufficientData {
            indicator: NAME,
            required: period,
            available: 0,
        })
}

pub fn calculate_ema_set(values: &[f64], periods: &[usize]) -> Result<MovingAverages, IndicatorError> {
    moving_average_set(NAME, values, periods, calculate_ema)
}
