//! SMA (Simple Moving Average) indicator

use super::{ensure_period, ensure_points, last_output, ta_build, Indicator, IndicatorError};
use crate::data::CandleSeries;
use std::collections::BTreeMap;
use ta::indicators::SimpleMovingAverage;

const NAME: &str = "sma";

/// Latest moving-average value per period
pub type MovingAverages = BTreeMap<usize, f64>;

/// SMA over a set of periods. Periods longer than the series are left out.
#[derive(Debug, Clone)]
pub struct Sma {
    periods: Vec<usize>,
}

impl Sma {
    pub fn new(periods: Vec<usize>) -> Self {
        Self { periods }
    }
}

impl Indicator for Sma {
    type Output = MovingAverages;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.periods.iter().copied().min().unwrap_or(1)
    }

    fn calculate(&self, series: &CandleSeries) -> Result<MovingAverages, IndicatorError> {
        calculate_sma_set(&series.closes(), &self.periods)
    }
}

/// Mean of the last `period` values
pub fn calculate_sma(values: &[f64], period: usize) -> Result<f64, IndicatorError> {
    ensure_period(NAME, "period", period)?;
    ensure_points(NAME, period, values.len())?;
    let mut sma = ta_build(NAME, "period", SimpleMovingAverage::new(period))?;
    last_output(&mut sma, values).ok_or(IndicatorError::InsufficientData {
        indicator: NAME,
        required: period,
        available: values.len(),
    })
}

/// Each period that fits the series; an error only when none of them fit
pub fn calculate_sma_set(values: &[f64], periods: &[usize]) -> Result<MovingAverages, IndicatorError> {
    moving_average_set(NAME, values, periods, calculate_sma)
}

pub(crate) fn moving_average_set<F>(
    indicator: &'static str,
    values: &[f64],
    periods: &[usize],
    calculate: F,
) -> Result<MovingAverages, IndicatorError>
where
    F: Fn(&[f64], usize) -> Result<f64, IndicatorError>,
{
    if periods.is_empty() {
        return Err(IndicatorError::InvalidParameter {
            indicator,
            reason: "no periods requested".to_string(),
        });
    }
    for &period in periods {
        ensure_period(indicator, "period", period)?;
    }

    let averages: MovingAverages = periods
        .iter()
        .filter(|&&period| period <= values.len())
        .map(|&period| calculate(values, period).map(|v| (period, v)))
        .collect::<Result<_, _>>()?;

    if averages.is_empty() {
        let shortest = periods.iter().copied().min().unwrap_or(1);
        return Err(IndicatorError::InsufficientData {
            indicator,
            required: shortest,
            available: values.len(),
        });
    }
    Ok(averages)
}
