// =============================================================================
// Stock API REST client
// =============================================================================
//
// Calls `GET {base}/api/stock/{symbol}/chart?period=..`. The bearer token is
// handed in by the host product and only ever attached as a header; it is
// never logged.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::data_feed::{DataFetcher, FetchRequest};
use crate::error::FetchError;
use crate::market_data::RawSeriesPayload;

/// HTTP implementation of [`DataFetcher`].
#[derive(Clone)]
pub struct HttpDataFetcher {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpDataFetcher {
    /// Create a new `HttpDataFetcher`.
    ///
    /// # Arguments
    /// * `base_url` — API root, e.g. `http://127.0.0.1:8000` (trailing `/` ok).
    /// * `token`    — optional bearer token supplied by the host product.
    /// * `timeout`  — per-request timeout.
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "HttpDataFetcher initialised");

        Ok(Self {
            base_url,
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/api/stock/{}/chart", self.base_url, symbol)
    }
}

#[async_trait]
impl DataFetcher for HttpDataFetcher {
    #[instrument(skip(self), name = "data_feed::fetch")]
    async fn fetch(&self, request: &FetchRequest) -> Result<RawSeriesPayload, FetchError> {
        let mut builder = self
            .client
            .get(self.chart_url(&request.symbol))
            .query(&[("period", request.period.query_value())]);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| FetchError::transport(format!("chart request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_detail(&body).unwrap_or_else(|| status.to_string());
            warn!(status = status.as_u16(), message = %message, "chart request rejected");
            return Err(FetchError::status(status.as_u16(), message));
        }

        let payload: RawSeriesPayload = resp.json().await.map_err(|e| {
            FetchError::status(status.as_u16(), format!("failed to decode chart payload: {e}"))
        })?;

        debug!(rows = payload.dates.len(), "chart payload received");
        Ok(payload)
    }
}

/// Pull the human-readable `detail` out of an API error body, if present.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
