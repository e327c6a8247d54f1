//! HTTP surface over [`MarketDataService`]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use market_data::analysis::AnalysisRequest;
use market_data::error::MarketDataError;
use market_data::service::MarketDataService;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, instrument, warn};

type AppState = Arc<MarketDataService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/stats", get(stats))
        .route("/api/candles/:symbol", get(get_candles))
        .route("/api/indicators/:symbol", get(get_indicators))
        .with_state(service)
}

/// Error body: `{"error": "VALIDATION_ERROR", "message": "..."}`
pub struct ApiError(MarketDataError);

impl From<MarketDataError> for ApiError {
    fn from(err: MarketDataError) -> Self {
        Self(err)
    }
}

fn status_for(err: &MarketDataError) -> StatusCode {
    match err {
        MarketDataError::Validation { .. } => StatusCode::BAD_REQUEST,
        MarketDataError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MarketDataError::HistoricalData { .. } => StatusCode::NOT_FOUND,
        MarketDataError::Source(_) => StatusCode::BAD_GATEWAY,
        MarketDataError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(code = self.0.code(), "request failed: {}", self.0);
        } else {
            warn!(code = self.0.code(), "request rejected: {}", self.0);
        }
        let body = json!({ "error": self.0.code(), "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn stats(State(service): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(service.stats().await?))
}

fn default_interval() -> String {
    "1h".to_string()
}

fn default_period() -> String {
    "30d".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CandlesQuery {
    #[serde(default = "default_interval")]
    interval: String,
    #[serde(default = "default_period")]
    period: String,
    #[serde(default)]
    force_refresh: bool,
}

#[instrument(skip(service))]
async fn get_candles(
    State(service): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<CandlesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let series = service
        .get_candles(&symbol, &query.interval, &query.period, query.force_refresh)
        .await?;
    Ok(Json(json!({
        "symbol": symbol.to_uppercase(),
        "interval": query.interval,
        "period": query.period,
        "count": series.len(),
        "candles": series,
    })))
}

#[derive(Debug, Deserialize)]
pub struct IndicatorsQuery {
    #[serde(default = "default_interval")]
    timeframe: String,
    #[serde(default = "default_period")]
    period: String,
    /// Comma separated names, e.g. `rsi,macd`
    indicators: Option<String>,
    current_price: Option<f64>,
    #[serde(default)]
    force_refresh: bool,
}

#[instrument(skip(service))]
async fn get_indicators(
    State(service): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<IndicatorsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut request = AnalysisRequest::new(symbol, query.timeframe, query.period).force_refresh(query.force_refresh);
    if let Some(names) = query.indicators.as_deref() {
        request = request.indicators(names.split(',').map(str::trim).filter(|s| !s.is_empty()));
    }
    if let Some(price) = query.current_price {
        request = request.current_price(price);
    }

    Ok(Json(service.get_indicators(&request).await?))
}
