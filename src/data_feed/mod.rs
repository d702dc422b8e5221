// =============================================================================
// Data Feed — seam to the authenticated stock API
// =============================================================================
//
// The chart pipeline only knows the `DataFetcher` trait. Credentials, session
// handling and transport live entirely on the implementation side.
// =============================================================================

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::market_data::RawSeriesPayload;
use crate::types::Period;

pub use client::HttpDataFetcher;

/// What the chart needs fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    pub period: Period,
}

impl std::fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.period)
    }
}

/// Source of raw OHLCV payloads.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawSeriesPayload, FetchError>;
}
