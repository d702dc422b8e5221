// =============================================================================
// Error taxonomy for the chart pipeline
// =============================================================================

use thiserror::Error;

use crate::types::SeriesKey;

/// Failure reported by the data fetcher.
///
/// `status` is the HTTP status when the server answered; transport-level
/// failures (connect, timeout) carry `None`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("fetch failed: {message}")]
pub struct FetchError {
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("malformed series payload: {0}")]
    DataShape(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("indicator {key} produced {actual} values for {expected} bars")]
    IndicatorCompute {
        key: SeriesKey,
        expected: usize,
        actual: usize,
    },

    #[error("chart construction failed: {0}")]
    Render(String),
}
