use crate::config::Settings;
use crate::error::IngestError;
use crate::ingest::types::SERIES_SECTION;
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ERROR_FIELD: &str = "Error Message";
const NOTE_FIELD: &str = "Note";

#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// One daily, compact-size series for one symbol. Returns the full
    /// parsed response unmodified.
    async fn fetch_daily(&self, symbol: &str, api_key: &str) -> Result<Value, IngestError>;
}

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url: settings.market_data_base_url().to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/query", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl MarketDataClient for AlphaVantageClient {
    fn provider_name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn fetch_daily(&self, symbol: &str, api_key: &str) -> Result<Value, IngestError> {
        let res = self
            .http
            .get(self.url())
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("apikey", api_key),
                ("outputsize", "compact"),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        let text = res.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(IngestError::Connectivity(format!("HTTP {status}: {text}")));
        }

        let payload: Value = serde_json::from_str(&text)
            .map_err(|err| IngestError::MalformedResponse(err.to_string()))?;

        validate_daily_payload(&payload)?;
        Ok(payload)
    }
}

fn transport_error(err: reqwest::Error) -> IngestError {
    if err.is_timeout() {
        IngestError::Timeout
    } else {
        IngestError::Connectivity(err.to_string())
    }
}

/// Upstream checks, most specific field first. An error payload and a
/// missing-data payload are only distinguishable by inspecting the narrower
/// fields before the series section, so the order here is load-bearing.
pub fn validate_daily_payload(payload: &Value) -> Result<(), IngestError> {
    if let Some(msg) = payload.get(ERROR_FIELD) {
        return Err(IngestError::Upstream(field_text(msg)));
    }
    if let Some(note) = payload.get(NOTE_FIELD) {
        return Err(IngestError::RateLimit(field_text(note)));
    }
    match payload.get(SERIES_SECTION).and_then(Value::as_object) {
        Some(series) if !series.is_empty() => Ok(()),
        _ => Err(IngestError::EmptyData),
    }
}

fn field_text(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}
