//! HTTP plumbing shared by the REST-backed sources

use super::rate_limit::RateGate;
use super::retry::RetryPolicy;
use crate::config::SourceConfig;
use crate::error::{SourceError, SourceErrorKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Decoded reply: HTTP status plus the JSON body (`Null` when the body was not JSON)
#[derive(Debug)]
pub(crate) struct JsonReply {
    pub status: u16,
    pub body: Value,
}

impl JsonReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One REST provider: a pooled client, its rate gate and retry policy
#[derive(Debug)]
pub(crate) struct HttpSource {
    pub name: &'static str,
    pub base_url: String,
    pub retry: RetryPolicy,
    pub max_pages: usize,
    client: reqwest::Client,
    gate: RateGate,
}

impl HttpSource {
    pub fn new(name: &'static str, config: &SourceConfig, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("market-data/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::new(name, SourceErrorKind::Transport(e.to_string())))?;

        Ok(Self {
            name,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from(&config.retry),
            max_pages: config.max_pages.max(1),
            client,
            gate: RateGate::per_minute(config.rate_limit_per_minute),
        })
    }

    /// GET `{base_url}{path}` after waiting on the rate gate. Only transport
    /// failures are errors here; status handling is left to the caller.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<JsonReply, SourceError> {
        self.gate.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        debug!(source = self.name, %url, ?query, "requesting candles");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(self.name, e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(self.name, e))?;

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(JsonReply { status, body }),
            Err(_) if !(200..300).contains(&status) => Ok(JsonReply { status, body: Value::Null }),
            Err(e) => Err(self.error(SourceErrorKind::Parse(e.to_string()))),
        }
    }

    pub fn error(&self, kind: SourceErrorKind) -> SourceError {
        SourceError::new(self.name, kind)
    }
}

/// Decode a provider payload into its typed shape
pub(crate) fn decode<T: DeserializeOwned>(source: &'static str, body: Value) -> Result<T, SourceError> {
    serde_json::from_value(body).map_err(|e| SourceError::new(source, SourceErrorKind::Parse(e.to_string())))
}

/// Providers quote prices as decimal strings
pub(crate) fn parse_price(raw: &str) -> Option<f64> {
    raw.parse().ok().filter(|v: &f64| v.is_finite())
}
