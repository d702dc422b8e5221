// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math over a validated OHLCV series. Every
// output is index-aligned with the input series: slot `i` belongs to bar `i`,
// and `None` marks the bootstrap region where the lookback window is not yet
// full. Empty input always produces empty output.

pub mod bollinger;
pub mod rsi;
pub mod sma;
pub mod volume;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;
use crate::market_data::ValidatedSeries;
use crate::types::{IndicatorKind, SeriesKey};

/// One indicator sample joined to its bar's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub timestamp: i64,
    pub value: Option<f64>,
}

/// A named, index-aligned derived series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    pub key: SeriesKey,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Join computed `values` to `timestamps` by position.
    ///
    /// # Errors
    /// `ChartError::IndicatorCompute` if the two lengths differ.
    pub fn from_values(
        key: SeriesKey,
        timestamps: &[i64],
        values: Vec<Option<f64>>,
    ) -> Result<Self, ChartError> {
        if timestamps.len() != values.len() {
            return Err(ChartError::IndicatorCompute {
                key,
                expected: timestamps.len(),
                actual: values.len(),
            });
        }

        let points = timestamps
            .iter()
            .zip(values)
            .map(|(&timestamp, value)| IndicatorPoint { timestamp, value })
            .collect();

        Ok(Self { key, points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn default_ma_period() -> usize {
    20
}

fn default_bb_period() -> usize {
    20
}

fn default_bb_k() -> f64 {
    bollinger::DEFAULT_NUM_STD
}

fn default_rsi_period() -> usize {
    rsi::DEFAULT_PERIOD
}

/// Lookback settings for every indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_ma_period")]
    pub ma_period: usize,
    #[serde(default = "default_bb_period")]
    pub bb_period: usize,
    #[serde(default = "default_bb_k")]
    pub bb_k: f64,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_period: default_ma_period(),
            bb_period: default_bb_period(),
            bb_k: default_bb_k(),
            rsi_period: default_rsi_period(),
        }
    }
}

/// Compute every series produced by `kind` (Bollinger yields three).
pub fn compute(
    kind: IndicatorKind,
    series: &ValidatedSeries,
    params: &IndicatorParams,
) -> Result<Vec<IndicatorSeries>, ChartError> {
    match kind {
        IndicatorKind::Vol => Ok(vec![volume::volume_series(series)?]),
        IndicatorKind::Ma => Ok(vec![sma::sma_series(series, params.ma_period)?]),
        IndicatorKind::Bb => bollinger::bollinger_series(series, params.bb_period, params.bb_k),
        IndicatorKind::Rsi => Ok(vec![rsi::rsi_series(series, params.rsi_period)?]),
    }
}
