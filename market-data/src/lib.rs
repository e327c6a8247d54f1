//! market-data: historical OHLCV candles and technical indicators
//!
//! Candles come from a priority-ordered chain of public price APIs
//! (Binance, OKX, CoinGecko) and are cached in SQLite. Indicators are pure
//! functions over the cached series.
//!
//! # Features
//!
//! - **Data Management**: candle model, intervals, lookback periods, SQLite cache
//! - **Sources**: rate-gated, retrying REST clients with ordered fallback
//! - **History**: cache, then network, then stale cache
//! - **Technical Indicators**: RSI, MACD, Bollinger Bands, SMA, EMA,
//!   Stochastic, Williams %R, CCI, Momentum
//! - **Analysis**: batch indicators with signals and partial results
//!
//! # Example
//!
//! ```no_run
//! use market_data::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PipelineConfig::default();
//!     let service = MarketDataService::connect("sqlite://data/historical_data.db", &config).await?;
//!     let request = AnalysisRequest::new("BTC", "1h", "7d").indicators(["rsi", "macd"]);
//!     let result = service.get_indicators(&request).await?;
//!     println!("{:?}", result.signals);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod history;
pub mod indicators;
pub mod service;
pub mod sources;

// Re-export commonly used types
pub mod prelude {
    pub use crate::analysis::*;
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::history::HistoricalDataManager;
    pub use crate::indicators::{IndicatorEngine, IndicatorKind, IndicatorParameters, IndicatorValues};
    pub use crate::service::MarketDataService;
    pub use crate::sources::{DataSource, SourceRegistry};
    pub use crate::Result;
}

/// Result type alias
pub type Result<T> = std::result::Result<T, error::MarketDataError>;
