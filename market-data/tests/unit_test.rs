//! Unit tests for market-data indicator and candle invariants

#[cfg(test)]
mod tests {
    use market_data::data::{is_sufficient, Candle, CandleSeries, Interval};
    use market_data::indicators::{
        calculate_bollinger, calculate_rsi, calculate_stochastic, calculate_williams_r, BollingerBands,
        Indicator, Rsi, Stochastic, WilliamsR,
    };

    /// Deterministic noisy walk; `seed` picks the shape
    fn walk(seed: u64, count: usize) -> Vec<Candle> {
        let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let mut price = 100.0;
        (0..count)
            .map(|i| {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                let step = ((state >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 4.0;
                let open = price;
                price = (price + step).max(1.0);
                let high = open.max(price) + step.abs() * 0.5;
                let low = (open.min(price) - step.abs() * 0.5).max(0.5);
                Candle::new("BTC", i as i64 * 3600, open, high, low, price, 10.0, Interval::OneHour, "test")
            })
            .collect()
    }

    #[test]
    fn test_walk_candles_are_valid() {
        for seed in 0..20 {
            assert!(walk(seed, 60).iter().all(Candle::is_valid));
        }
    }

    #[test]
    fn test_rsi_stays_in_range() {
        for seed in 0..50 {
            let series = CandleSeries::from(walk(seed, 35 + seed as usize));
            let rsi = Rsi::new(14).calculate(&series).unwrap();
            assert!((0.0..=100.0).contains(&rsi), "rsi {} out of range for seed {}", rsi, seed);
        }
    }

    #[test]
    fn test_bollinger_ordering() {
        for seed in 0..50 {
            let series = CandleSeries::from(walk(seed, 40));
            let bands = BollingerBands::new(20, 2.0).calculate(&series).unwrap();
            assert!(bands.upper >= bands.middle);
            assert!(bands.middle >= bands.lower);
        }
    }

    #[test]
    fn test_stochastic_in_range() {
        for seed in 0..50 {
            let series = CandleSeries::from(walk(seed, 30));
            let value = Stochastic::new(14, 3).calculate(&series).unwrap();
            assert!((0.0..=100.0).contains(&value.k));
            assert!((0.0..=100.0).contains(&value.d));
        }
    }

    #[test]
    fn test_williams_in_range() {
        for seed in 0..50 {
            let series = CandleSeries::from(walk(seed, 30));
            let value = WilliamsR::new(14).calculate(&series).unwrap();
            assert!((-100.0..=0.0).contains(&value));
        }
    }

    #[test]
    fn test_slice_functions_match_trait() {
        let series = CandleSeries::from(walk(7, 50));
        assert_eq!(
            calculate_rsi(&series.closes(), 14).unwrap(),
            Rsi::new(14).calculate(&series).unwrap()
        );
        assert_eq!(
            calculate_bollinger(&series.closes(), 20, 2.0).unwrap(),
            BollingerBands::new(20, 2.0).calculate(&series).unwrap()
        );
        assert_eq!(
            calculate_stochastic(&series.highs(), &series.lows(), &series.closes(), 14, 3).unwrap(),
            Stochastic::new(14, 3).calculate(&series).unwrap()
        );
        assert_eq!(
            calculate_williams_r(&series.highs(), &series.lows(), &series.closes(), 14).unwrap(),
            WilliamsR::new(14).calculate(&series).unwrap()
        );
    }

    #[test]
    fn test_sufficiency_boundary() {
        // 7 days of 1h bars: 168 expected, exactly 0.8 of that is 134.4
        let (start, end) = (0, 7 * 86_400);
        assert!(is_sufficient(135, start, end, Interval::OneHour, 0.8));
        assert!(!is_sufficient(134, start, end, Interval::OneHour, 0.8));

        // 90 days of 1d bars: 72 of 90 is exactly 0.8
        let (start, end) = (0, 90 * 86_400);
        assert!(is_sufficient(72, start, end, Interval::OneDay, 0.8));
        assert!(!is_sufficient(71, start, end, Interval::OneDay, 0.8));
    }
}
