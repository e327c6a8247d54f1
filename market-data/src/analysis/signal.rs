//! Discrete readings derived from indicator values

use crate::indicators::{IndicatorKind, IndicatorValues};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    Overbought,
    Oversold,
    Neutral,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Overbought => "overbought",
            Self::Oversold => "oversold",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn rsi_signal(rsi: f64) -> Signal {
    if rsi > RSI_OVERBOUGHT {
        Signal::Overbought
    } else if rsi < RSI_OVERSOLD {
        Signal::Oversold
    } else {
        Signal::Neutral
    }
}

pub fn macd_signal(histogram: f64) -> Signal {
    if histogram > 0.0 {
        Signal::Bullish
    } else {
        Signal::Bearish
    }
}

/// Price relative to the bands: above upper is overbought, below lower oversold
pub fn bollinger_signal(price: f64, upper: f64, lower: f64) -> Signal {
    if price > upper {
        Signal::Overbought
    } else if price < lower {
        Signal::Oversold
    } else {
        Signal::Neutral
    }
}

/// Signals for every computed indicator that has a classification. Bollinger
/// bands are only classified against an explicit `current_price`.
pub fn derive_signals(values: &IndicatorValues, current_price: Option<f64>) -> BTreeMap<IndicatorKind, Signal> {
    let mut signals = BTreeMap::new();

    if let Some(rsi) = values.rsi {
        signals.insert(IndicatorKind::Rsi, rsi_signal(rsi));
    }
    if let Some(macd) = &values.macd {
        signals.insert(IndicatorKind::Macd, macd_signal(macd.histogram));
    }
    if let (Some(bands), Some(price)) = (&values.bollinger_bands, current_price) {
        signals.insert(
            IndicatorKind::BollingerBands,
            bollinger_signal(price, bands.upper, bands.lower),
        );
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{BollingerValue, MacdValue};

    #[test]
    fn test_rsi_thresholds_are_strict() {
        assert_eq!(rsi_signal(70.0), Signal::Neutral);
        assert_eq!(rsi_signal(70.1), Signal::Overbought);
        assert_eq!(rsi_signal(30.0), Signal::Neutral);
        assert_eq!(rsi_signal(29.9), Signal::Oversold);
    }

    #[test]
    fn test_macd_zero_is_bearish() {
        assert_eq!(macd_signal(0.0), Signal::Bearish);
        assert_eq!(macd_signal(0.01), Signal::Bullish);
    }

    #[test]
    fn test_bollinger_needs_price() {
        let values = IndicatorValues {
            macd: Some(MacdValue { macd: 1.0, signal: 0.5, histogram: 0.5 }),
            bollinger_bands: Some(BollingerValue { upper: 110.0, middle: 100.0, lower: 90.0, bandwidth: 20.0 }),
            ..IndicatorValues::default()
        };

        let signals = derive_signals(&values, None);
        assert_eq!(signals.get(&IndicatorKind::Macd), Some(&Signal::Bullish));
        assert!(!signals.contains_key(&IndicatorKind::BollingerBands));

        let signals = derive_signals(&values, Some(85.0));
        assert_eq!(signals.get(&IndicatorKind::BollingerBands), Some(&Signal::Oversold));
        assert_eq!(serde_json::to_string(&Signal::Oversold).unwrap(), "\"oversold\"");
    }
}
