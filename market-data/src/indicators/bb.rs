//! Bollinger Bands indicator

use super::math::sample_std;
use super::{ensure_points, last_output, ta_build, Indicator, IndicatorError};
use crate::data::CandleSeries;
use serde::{Deserialize, Serialize};
use ta::indicators::SimpleMovingAverage;

const NAME: &str = "bollinger_bands";

#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    period: usize,
    std_multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_multiplier: f64) -> Self {
        Self {
            period,
            std_multiplier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Band width as a percentage of the middle band
    pub bandwidth: f64,
}

impl Indicator for BollingerBands {
    type Output = BollingerValue;

    fn name(&self) -> &'static str {
        NAME
    }

    fn min_points(&self) -> usize {
        self.period
    }

    fn calculate(&self, series: &CandleSeries) -> Result<BollingerValue, IndicatorError> {
        calculate_bollinger(&series.closes(), self.period, self.std_multiplier)
    }
}

/// Bands around the SMA of the last `period` closes, using the sample
/// standard deviation of the same window.
pub fn calculate_bollinger(closes: &[f64], period: usize, std_multiplier: f64) -> Result<BollingerValue, IndicatorError> {
    if period < 2 {
        return Err(IndicatorError::InvalidParameter {
            indicator: NAME,
            reason: "period must be at least 2".to_string(),
        });
    }
    if !std_multiplier.is_finite() || std_multiplier < 0.0 {
        return Err(IndicatorError::InvalidParameter {
            indicator: NAME,
            reason: format!("std multiplier must be non-negative, got {}", std_multiplier),
        });
    }
    ensure_points(NAME, period, closes.len())?;

    let window = &closes[closes.len() - period..];
    let mut sma = ta_build(NAME, "period", SimpleMovingAverage::new(period))?;
    let middle = last_output(&mut sma, window).unwrap_or(0.0);
    let offset = std_multiplier * sample_std(window);
    let (upper, lower) = (middle + offset, middle - offset);

    if middle == 0.0 {
        return Err(IndicatorError::Undefined {
            indicator: NAME,
            reason: "middle band is zero".to_string(),
        });
    }

    Ok(BollingerValue {
        upper,
        middle,
        lower,
        bandwidth: (upper - lower) / middle * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_ordering() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let bands = calculate_bollinger(&closes, 20, 2.0).unwrap();
        assert!(bands.upper >= bands.middle);
        assert!(bands.middle >= bands.lower);
        assert!(bands.bandwidth > 0.0);
    }

    #[test]
    fn test_flat_series_collapses_bands() {
        let bands = calculate_bollinger(&[10.0; 20], 20, 2.0).unwrap();
        assert_eq!(bands.upper, 10.0);
        assert_eq!(bands.lower, 10.0);
        assert_eq!(bands.bandwidth, 0.0);
    }

    #[test]
    fn test_uses_only_last_window() {
        let mut closes = vec![1000.0; 5];
        closes.extend([1.0, 2.0, 3.0]);
        let bands = calculate_bollinger(&closes, 3, 1.0).unwrap();
        assert_eq!(bands.middle, 2.0);
        assert_eq!(bands.upper, 3.0);
    }
}
