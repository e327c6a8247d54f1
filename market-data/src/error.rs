//! Error taxonomy for the market-data pipeline
//!
//! Only [`SourceError`] is ever retried. Validation, insufficient data and
//! store failures are terminal for the call that hit them.

use serde::Serialize;
use thiserror::Error;

/// Why a single upstream request failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Connection, DNS or TLS failure
    #[error("transport failure: {0}")]
    Transport(String),
    /// The request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,
    /// Non-2xx HTTP response
    #[error("HTTP status {0}")]
    Status(u16),
    /// The provider answered 2xx but reported an error in its payload
    #[error("provider error: {0}")]
    Provider(String),
    /// The body could not be decoded
    #[error("malformed response: {0}")]
    Parse(String),
    /// Symbol or interval the provider cannot serve; never retried
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Failure of one upstream data source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("source {source_name} failed: {kind}")]
pub struct SourceError {
    pub source_name: String,
    pub kind: SourceErrorKind,
}

impl SourceError {
    pub fn new(source_name: impl Into<String>, kind: SourceErrorKind) -> Self {
        Self {
            source_name: source_name.into(),
            kind,
        }
    }

    pub fn unsupported(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(source_name, SourceErrorKind::Unsupported(reason.into()))
    }

    /// Everything except an explicit "unsupported" answer is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, SourceErrorKind::Unsupported(_))
    }

    pub(crate) fn from_reqwest(source_name: &str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            SourceErrorKind::Timeout
        } else if err.is_decode() {
            SourceErrorKind::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            SourceErrorKind::Status(status.as_u16())
        } else {
            SourceErrorKind::Transport(err.to_string())
        };
        Self::new(source_name, kind)
    }
}

/// Local persistence failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row is invalid: {0}")]
    InvalidRow(String),
}

/// What a minimum-data requirement applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataScope {
    /// The analysis request as a whole
    Request,
    /// One named indicator
    Indicator(String),
}

impl std::fmt::Display for DataScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request => write!(f, "analysis"),
            Self::Indicator(name) => write!(f, "indicator {}", name),
        }
    }
}

/// Public error surface of the pipeline
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("invalid {field} '{value}': {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("insufficient data for {scope}: need at least {required} candles, have {available}")]
    InsufficientData {
        scope: DataScope,
        required: usize,
        available: usize,
    },

    #[error("no historical data available for {symbol}")]
    HistoricalData { symbol: String },

    #[error("candle store failure: {0}")]
    Store(#[from] StoreError),
}

impl MarketDataError {
    pub fn validation(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code, used by outer layers for status mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Source(_) => "SOURCE_ERROR",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::HistoricalData { .. } => "HISTORICAL_DATA_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<sqlx::Error> for MarketDataError {
    fn from(err: sqlx::Error) -> Self {
        MarketDataError::Store(StoreError::Database(err))
    }
}
