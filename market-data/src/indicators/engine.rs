//! Batch indicator computation

use super::{
    BollingerBands, BollingerValue, Cci, Ema, Indicator, IndicatorError, IndicatorKind, Macd,
    MacdValue, Momentum, MovingAverages, Rsi, Sma, Stochastic, StochasticValue, WilliamsR,
};
use crate::data::CandleSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Tunable periods for every indicator; missing fields take the defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParameters {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub sma_periods: Vec<usize>,
    pub ema_periods: Vec<usize>,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub williams_period: usize,
    pub cci_period: usize,
    pub momentum_period: usize,
}

impl Default for IndicatorParameters {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std: 2.0,
            sma_periods: vec![20, 50],
            ema_periods: vec![12, 26],
            stoch_k: 14,
            stoch_d: 3,
            williams_period: 14,
            cci_period: 20,
            momentum_period: 10,
        }
    }
}

/// Latest value of each computed indicator. `None` means not requested or
/// not computable; the latter is explained in `omitted`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorValues {
    pub rsi: Option<f64>,
    pub macd: Option<MacdValue>,
    pub bollinger_bands: Option<BollingerValue>,
    pub sma: Option<MovingAverages>,
    pub ema: Option<MovingAverages>,
    pub stochastic: Option<StochasticValue>,
    pub williams_r: Option<f64>,
    pub cci: Option<f64>,
    pub momentum: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub omitted: BTreeMap<IndicatorKind, String>,
}

impl IndicatorValues {
    pub fn computed(&self) -> Vec<IndicatorKind> {
        IndicatorKind::ALL
            .into_iter()
            .filter(|kind| self.is_computed(*kind))
            .collect()
    }

    pub fn is_computed(&self, kind: IndicatorKind) -> bool {
        match kind {
            IndicatorKind::Rsi => self.rsi.is_some(),
            IndicatorKind::Macd => self.macd.is_some(),
            IndicatorKind::BollingerBands => self.bollinger_bands.is_some(),
            IndicatorKind::Sma => self.sma.is_some(),
            IndicatorKind::Ema => self.ema.is_some(),
            IndicatorKind::Stochastic => self.stochastic.is_some(),
            IndicatorKind::WilliamsR => self.williams_r.is_some(),
            IndicatorKind::Cci => self.cci.is_some(),
            IndicatorKind::Momentum => self.momentum.is_some(),
        }
    }
}

/// Computes batches of indicators with one parameter set
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    params: IndicatorParameters,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParameters {
        &self.params
    }

    /// Candles `kind` needs under the current parameters
    pub fn min_points(&self, kind: IndicatorKind) -> usize {
        let p = &self.params;
        match kind {
            IndicatorKind::Rsi => Rsi::new(p.rsi_period).min_points(),
            IndicatorKind::Macd => Macd::new(p.macd_fast, p.macd_slow, p.macd_signal).min_points(),
            IndicatorKind::BollingerBands => BollingerBands::new(p.bb_period, p.bb_std).min_points(),
            IndicatorKind::Sma => Sma::new(p.sma_periods.clone()).min_points(),
            IndicatorKind::Ema => Ema::new(p.ema_periods.clone()).min_points(),
            IndicatorKind::Stochastic => Stochastic::new(p.stoch_k, p.stoch_d).min_points(),
            IndicatorKind::WilliamsR => WilliamsR::new(p.williams_period).min_points(),
            IndicatorKind::Cci => Cci::new(p.cci_period).min_points(),
            IndicatorKind::Momentum => Momentum::new(p.momentum_period).min_points(),
        }
    }

    /// Compute every indicator in `kinds`. A failing indicator is recorded in
    /// `omitted` and never stops the others.
    pub fn compute(&self, series: &CandleSeries, kinds: &[IndicatorKind]) -> IndicatorValues {
        let p = &self.params;
        let mut values = IndicatorValues::default();

        for &kind in kinds {
            let omitted = &mut values.omitted;
            match kind {
                IndicatorKind::Rsi => {
                    values.rsi = record(kind, Rsi::new(p.rsi_period).calculate(series), omitted)
                }
                IndicatorKind::Macd => {
                    let macd = Macd::new(p.macd_fast, p.macd_slow, p.macd_signal);
                    values.macd = record(kind, macd.calculate(series), omitted)
                }
                IndicatorKind::BollingerBands => {
                    let bands = BollingerBands::new(p.bb_period, p.bb_std);
                    values.bollinger_bands = record(kind, bands.calculate(series), omitted)
                }
                IndicatorKind::Sma => {
                    let sma = Sma::new(p.sma_periods.clone());
                    values.sma = record(kind, sma.calculate(series), omitted)
                }
                IndicatorKind::Ema => {
                    let ema = Ema::new(p.ema_periods.clone());
                    values.ema = record(kind, ema.calculate(series), omitted)
                }
                IndicatorKind::Stochastic => {
                    let stoch = Stochastic::new(p.stoch_k, p.stoch_d);
                    values.stochastic = record(kind, stoch.calculate(series), omitted)
                }
                IndicatorKind::WilliamsR => {
                    let williams = WilliamsR::new(p.williams_period);
                    values.williams_r = record(kind, williams.calculate(series), omitted)
                }
                IndicatorKind::Cci => {
                    values.cci = record(kind, Cci::new(p.cci_period).calculate(series), omitted)
                }
                IndicatorKind::Momentum => {
                    let momentum = Momentum::new(p.momentum_period);
                    values.momentum = record(kind, momentum.calculate(series), omitted)
                }
            }
        }

        debug!(
            requested = kinds.len(),
            omitted = values.omitted.len(),
            candles = series.len(),
            "indicators computed"
        );
        values
    }
}

fn record<T>(
    kind: IndicatorKind,
    result: Result<T, IndicatorError>,
    omitted: &mut BTreeMap<IndicatorKind, String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(indicator = %kind, "indicator omitted: {}", err);
            omitted.insert(kind, err.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Candle, Interval};

    fn series(closes: &[f64]) -> CandleSeries {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new("BTC", i as i64 * 3600, c, c + 1.0, c - 1.0, c, 10.0, Interval::OneHour, "test"))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_partial_results() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + (i % 5) as f64).collect();
        let values = IndicatorEngine::default().compute(&series(&closes), &IndicatorKind::ALL);

        assert!(values.rsi.is_some());
        assert!(values.bollinger_bands.is_some());
        // needs 35 candles with the default periods
        assert!(values.macd.is_none());
        assert!(values.omitted.contains_key(&IndicatorKind::Macd));
        // sma_50 dropped, sma_20 kept
        assert_eq!(values.sma.as_ref().map(|m| m.len()), Some(1));
        assert_eq!(values.computed().len(), 8);
    }

    #[test]
    fn test_only_requested_kinds() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let values = IndicatorEngine::default().compute(&series(&closes), &[IndicatorKind::Rsi]);
        assert!(values.rsi.is_some());
        assert!(values.cci.is_none());
        assert!(values.omitted.is_empty());
    }

    #[test]
    fn test_parameters_deserialize_with_defaults() {
        let params: IndicatorParameters = serde_json::from_str(r#"{"rsi_period": 7}"#).unwrap();
        assert_eq!(params.rsi_period, 7);
        assert_eq!(params.macd_slow, 26);
        assert_eq!(IndicatorEngine::new(params).min_points(IndicatorKind::Rsi), 8);
    }
}
