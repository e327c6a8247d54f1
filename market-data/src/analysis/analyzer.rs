//! Analysis orchestrator

use super::signal::{derive_signals, Signal};
use crate::data::{normalize_symbol, CandleSeries, Interval, Period};
use crate::error::{DataScope, MarketDataError};
use crate::history::HistoricalDataManager;
use crate::indicators::{IndicatorEngine, IndicatorKind, IndicatorParameters, IndicatorValues};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// One `GetIndicators` call. Everything is a raw string until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub timeframe: String,
    pub period: String,
    /// Indicator names; `None` means all nine
    #[serde(default)]
    pub indicators: Option<Vec<String>>,
    #[serde(default)]
    pub params: Option<IndicatorParameters>,
    #[serde(default)]
    pub current_price_hint: Option<f64>,
    #[serde(default)]
    pub force_refresh: bool,
}

impl AnalysisRequest {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            period: period.into(),
            indicators: None,
            params: None,
            current_price_hint: None,
            force_refresh: false,
        }
    }

    pub fn indicators<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indicators = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn params(mut self, params: IndicatorParameters) -> Self {
        self.params = Some(params);
        self
    }

    pub fn current_price(mut self, price: f64) -> Self {
        self.current_price_hint = Some(price);
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub timeframe: Interval,
    pub period: Period,
    /// When the analysis finished
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub indicators: IndicatorValues,
    pub signals: BTreeMap<IndicatorKind, Signal>,
    pub data_points_used: usize,
    pub calculation_time_ms: f64,
}

/// A request with every field parsed
#[derive(Debug, Clone)]
struct ValidatedRequest {
    symbol: String,
    timeframe: Interval,
    period: Period,
    kinds: Vec<IndicatorKind>,
}

fn validate(request: &AnalysisRequest) -> Result<ValidatedRequest> {
    let symbol = normalize_symbol(&request.symbol)?;
    let timeframe: Interval = request.timeframe.parse()?;
    let period: Period = request.period.parse()?;

    let kinds = match &request.indicators {
        None => IndicatorKind::ALL.to_vec(),
        Some(names) => {
            let mut kinds = Vec::with_capacity(names.len());
            for name in names {
                let kind: IndicatorKind = name.parse()?;
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            kinds
        }
    };

    if let Some(price) = request.current_price_hint {
        if !price.is_finite() || price <= 0.0 {
            return Err(MarketDataError::validation(
                "current_price",
                price.to_string(),
                "must be a positive number",
            ));
        }
    }

    Ok(ValidatedRequest {
        symbol,
        timeframe,
        period,
        kinds,
    })
}

pub struct TechnicalAnalyzer {
    history: Arc<HistoricalDataManager>,
    min_candles: usize,
}

impl TechnicalAnalyzer {
    pub fn new(history: Arc<HistoricalDataManager>, min_candles: usize) -> Self {
        Self {
            history,
            min_candles,
        }
    }

    /// Validate, load candles, compute the requested indicators and derive
    /// signals. Nothing touches the store or the network until the request
    /// has been validated.
    #[instrument(skip(self, request), fields(symbol = %request.symbol, timeframe = %request.timeframe))]
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let started = Instant::now();
        let validated = validate(request)?;

        let series = self
            .history
            .get_candles(
                &validated.symbol,
                validated.timeframe,
                validated.period,
                request.force_refresh,
            )
            .await?;

        let defaults = IndicatorParameters::default();
        let params = request.params.as_ref().unwrap_or(&defaults);
        let mut result = self.analyze_series(
            &validated.symbol,
            validated.timeframe,
            validated.period,
            &series,
            &validated.kinds,
            params,
            request.current_price_hint,
        )?;
        result.calculation_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        info!(
            symbol = %result.symbol,
            data_points = result.data_points_used,
            computed = result.indicators.computed().len(),
            omitted = result.indicators.omitted.len(),
            elapsed_ms = result.calculation_time_ms,
            "analysis complete"
        );
        Ok(result)
    }

    /// Indicators and signals over an already loaded series
    #[allow(clippy::too_many_arguments)]
    pub fn analyze_series(
        &self,
        symbol: &str,
        timeframe: Interval,
        period: Period,
        series: &CandleSeries,
        kinds: &[IndicatorKind],
        params: &IndicatorParameters,
        current_price_hint: Option<f64>,
    ) -> Result<AnalysisResult> {
        let started = Instant::now();
        if series.len() < self.min_candles {
            return Err(MarketDataError::InsufficientData {
                scope: DataScope::Request,
                required: self.min_candles,
                available: series.len(),
            });
        }

        let indicators = IndicatorEngine::new(params.clone()).compute(series, kinds);
        let signals = derive_signals(&indicators, current_price_hint);

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            timeframe,
            period,
            timestamp: Utc::now(),
            indicators,
            signals,
            data_points_used: series.len(),
            calculation_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }
}
