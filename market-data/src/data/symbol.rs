//! Exchange-agnostic symbol handling

use crate::error::MarketDataError;

/// Canonical form: uppercase bare ticker ("BTC") or pair ("BTC/USDT").
/// Accepts `-` as a pair separator.
pub fn normalize_symbol(raw: &str) -> Result<String, MarketDataError> {
    let upper = raw.trim().to_uppercase().replace('-', "/");
    let parts: Vec<&str> = upper.split('/').collect();

    let valid_part = |p: &str| (2..=12).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric());
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        return Err(MarketDataError::validation(
            "symbol",
            raw,
            "expected a ticker like BTC or a pair like BTC/USDT",
        ));
    }
    Ok(upper)
}

/// Split a canonical symbol into (base, quote). Bare tickers get
/// `default_quote`, unless they already end with it ("BTCUSDT").
pub fn split_pair(symbol: &str, default_quote: &str) -> (String, String) {
    let symbol = symbol.to_uppercase();
    if let Some((base, quote)) = symbol.split_once('/') {
        return (base.to_string(), quote.to_string());
    }
    let quote = default_quote.to_uppercase();
    match symbol.strip_suffix(&quote) {
        Some(base) if base.len() >= 2 => (base.to_string(), quote),
        _ => (symbol, quote),
    }
}

/// Cache key for a normalized symbol. Bare tickers gain `default_quote`, so
/// "BTC", "BTCUSDT" and "BTC/USDT" all name the same market.
pub fn canonical_pair(symbol: &str, default_quote: &str) -> String {
    let (base, quote) = split_pair(symbol, default_quote);
    format!("{}/{}", base, quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" btc ").unwrap(), "BTC");
        assert_eq!(normalize_symbol("eth-usdt").unwrap(), "ETH/USDT");
        assert_eq!(normalize_symbol("1INCH/USDT").unwrap(), "1INCH/USDT");
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("BTC/USDT/EUR").is_err());
        assert!(normalize_symbol("B$C").is_err());
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("BTC/EUR", "USDT"), ("BTC".to_string(), "EUR".to_string()));
        assert_eq!(split_pair("BTC", "USDT"), ("BTC".to_string(), "USDT".to_string()));
        assert_eq!(split_pair("BTCUSDT", "USDT"), ("BTC".to_string(), "USDT".to_string()));
        assert_eq!(split_pair("USDT", "USDT"), ("USDT".to_string(), "USDT".to_string()));
    }

    #[test]
    fn test_canonical_pair() {
        for raw in ["BTC", "BTCUSDT", "BTC/USDT"] {
            assert_eq!(canonical_pair(raw, "USDT"), "BTC/USDT");
        }
        assert_eq!(canonical_pair("ETH/EUR", "USDT"), "ETH/EUR");
    }
}
