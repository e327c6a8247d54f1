//! Facade for outside callers: HTTP handlers, CLIs, agents

use crate::analysis::{AnalysisRequest, AnalysisResult, TechnicalAnalyzer};
use crate::config::PipelineConfig;
use crate::data::{CandleSeries, CandleStore, StoreStats};
use crate::history::HistoricalDataManager;
use crate::sources::SourceRegistry;
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub struct MarketDataService {
    history: Arc<HistoricalDataManager>,
    analyzer: TechnicalAnalyzer,
    store: Arc<CandleStore>,
}

impl MarketDataService {
    pub fn new(store: Arc<CandleStore>, registry: Arc<SourceRegistry>, config: &PipelineConfig) -> Self {
        let history = Arc::new(HistoricalDataManager::from_config(store.clone(), registry, config));
        let analyzer = TechnicalAnalyzer::new(history.clone(), config.min_analysis_candles);
        Self {
            history,
            analyzer,
            store,
        }
    }

    /// Store on `database_url` plus the default Binance, OKX, CoinGecko chain
    pub async fn connect(database_url: &str, config: &PipelineConfig) -> Result<Self> {
        let store = Arc::new(CandleStore::connect(database_url, config).await?);
        let registry = Arc::new(SourceRegistry::from_config(config)?);
        info!(sources = ?registry.names(), "market data service ready");
        Ok(Self::new(store, registry, config))
    }

    pub async fn get_indicators(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        self.analyzer.analyze(request).await
    }

    pub async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        period: &str,
        force_refresh: bool,
    ) -> Result<CandleSeries> {
        self.history.get_data(symbol, interval, period, force_refresh).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats().await?)
    }

    /// Drop rows past the retention window, returns rows removed
    pub async fn purge_expired(&self) -> Result<u64> {
        Ok(self.store.purge_expired(chrono::Utc::now().timestamp()).await?)
    }
}
