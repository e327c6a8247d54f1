//! RSI (Relative Strength Index) indicator

use super::{ensure_period, ensure_points, last_output, ta_build, Indicator, IndicatorError};
use crate::data::CandleSeries;
use ta::indicators::SimpleMovingAverage;

const NAME: &str = "rsi";

/// RSI over simple rolling means of gains and losses
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// Get RSI period
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, series: &CandleSeries) -> Result<f64, IndicatorError> {
        calculate_rsi(&series.closes(), self.period)
    }
}

/// RSI of the latest close. Needs `period + 1` values.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Result<f64, IndicatorError> {
    ensure_period(NAME, "period", period)?;
    ensure_points(NAME, period + 1, closes.len())?;

    // only the last `period` deltas matter, so the averages start from a clean sum
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes[closes.len() - period - 1..]
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .unzip();

    let mut gain_sma = ta_build(NAME, "period", SimpleMovingAverage::new(period))?;
    let mut loss_sma = ta_build(NAME, "period", SimpleMovingAverage::new(period))?;
    let avg_gain = last_output(&mut gain_sma, &gains).unwrap_or(0.0);
    let avg_loss = last_output(&mut loss_sma, &losses).unwrap_or(0.0);

    if avg_loss == 0.0 {
        // no losses: pinned high, or midpoint when nothing moved
        return Ok(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Ok(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_needs_period_plus_one() {
        let values = vec![100.0, 102.0, 101.0, 103.0, 105.0, 104.0, 106.0];
        let err = calculate_rsi(&values, 14).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                indicator: "rsi",
                required: 15,
                available: 7
            }
        );
        assert!(calculate_rsi(&values, 6).is_ok());
    }

    #[test]
    fn test_rsi_known_value() {
        // gains 2,0,2,2 / losses 0,1,0,0 over period 4 -> rs = 6/1
        let rsi = calculate_rsi(&[100.0, 102.0, 101.0, 103.0, 105.0], 4).unwrap();
        assert!((rsi - (100.0 - 100.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_degenerate_windows() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(calculate_rsi(&rising, 14).unwrap(), 100.0);

        let flat = vec![50.0; 20];
        assert_eq!(calculate_rsi(&flat, 14).unwrap(), 50.0);

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert_eq!(calculate_rsi(&falling, 14).unwrap(), 0.0);
    }
}
