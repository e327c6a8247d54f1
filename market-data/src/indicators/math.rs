//! Statistics the `ta` crate does not offer in the required form
//!
//! `ta`'s moving averages are seeded recursively and its standard deviation
//! divides by `n`. Bollinger bands want the sample deviation, MACD and EMA want
//! bias-adjusted exponential weights from the first value.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with an `n - 1` denominator
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Span-based exponential mean with bias-adjusted weights.
///
/// `y[t] = sum((1-a)^i * x[t-i]) / sum((1-a)^i)` for `i in 0..=t`, with
/// `a = 2 / (span + 1)`. Defined from the first value onward.
pub fn ewm_mean(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut num = 0.0;
    let mut den = 0.0;
    values
        .iter()
        .map(|x| {
            num = x + decay * num;
            den = 1.0 + decay * den;
            num / den
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_std() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((std - 2.138_089_935).abs() < 1e-9);
        assert_eq!(sample_std(&[3.0]), 0.0);
    }

    #[test]
    fn test_ewm_adjusted_weights() {
        // span 3 -> alpha 0.5: second value is (2 + 0.5 * 1) / 1.5
        let ema = ewm_mean(&[1.0, 2.0], 3);
        assert_eq!(ema[0], 1.0);
        assert!((ema[1] - 2.5 / 1.5).abs() < 1e-12);
    }
}
