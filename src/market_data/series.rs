// =============================================================================
// Series Validator — raw chart payload to a clean OHLCV series
// =============================================================================
//
// The stock API returns six parallel arrays. Shape problems (length mismatch,
// no dates at all) reject the whole payload; bad individual rows are dropped
// and the rest of the series survives.
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ChartError;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Chart payload exactly as received from the network.
///
/// Elements are kept as raw JSON so that `null`, numeric strings and numbers
/// can all be judged row by row. The API names the close array `prices`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSeriesPayload {
    #[serde(default)]
    pub dates: Vec<Value>,
    #[serde(default)]
    pub opens: Vec<Value>,
    #[serde(default)]
    pub highs: Vec<Value>,
    #[serde(default)]
    pub lows: Vec<Value>,
    #[serde(default, alias = "prices")]
    pub closes: Vec<Value>,
    #[serde(default)]
    pub volumes: Vec<Value>,
}

/// A single validated bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvPoint {
    /// Epoch milliseconds at 00:00 UTC of the bar's calendar date.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Ordered, finite OHLCV bars. Timestamps never decrease; duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatedSeries {
    points: Vec<OhlcvPoint>,
}

impl ValidatedSeries {
    /// Build a series from already-parsed points.
    ///
    /// Points with a non-finite price are dropped. Out-of-order input is
    /// stable-sorted so equal timestamps keep their original relative order.
    pub fn from_points(points: Vec<OhlcvPoint>) -> Self {
        let total = points.len();
        let mut points: Vec<OhlcvPoint> = points
            .into_iter()
            .filter(|p| {
                p.open.is_finite() && p.high.is_finite() && p.low.is_finite() && p.close.is_finite()
            })
            .collect();

        if points.len() != total {
            debug!(dropped = total - points.len(), "non-finite points removed");
        }

        if points.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
            warn!(len = points.len(), "series timestamps out of order — sorting");
            points.sort_by_key(|p| p.timestamp);
        }

        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[OhlcvPoint] {
        &self.points
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume as f64).collect()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate and normalise a raw payload.
///
/// # Errors
/// `ChartError::DataShape` when `dates` is empty or any other array has a
/// different length from `dates`.
pub fn validate(raw: &RawSeriesPayload) -> Result<ValidatedSeries, ChartError> {
    let expected = raw.dates.len();
    if expected == 0 {
        return Err(ChartError::DataShape("dates array is empty".to_string()));
    }

    let columns = [
        ("opens", raw.opens.len()),
        ("highs", raw.highs.len()),
        ("lows", raw.lows.len()),
        ("closes", raw.closes.len()),
        ("volumes", raw.volumes.len()),
    ];
    for (name, len) in columns {
        if len != expected {
            return Err(ChartError::DataShape(format!(
                "{name} has {len} entries but dates has {expected}"
            )));
        }
    }

    let points: Vec<OhlcvPoint> = (0..expected).filter_map(|i| parse_row(raw, i)).collect();

    let dropped = expected - points.len();
    if dropped > 0 {
        warn!(dropped, kept = points.len(), "invalid rows dropped from series");
    }

    Ok(ValidatedSeries::from_points(points))
}

fn parse_row(raw: &RawSeriesPayload, i: usize) -> Option<OhlcvPoint> {
    let timestamp = parse_date_millis(&raw.dates[i])?;
    let volume = parse_finite(&raw.volumes[i])?;
    if volume < 0.0 {
        return None;
    }

    Some(OhlcvPoint {
        timestamp,
        open: parse_finite(&raw.opens[i])?,
        high: parse_finite(&raw.highs[i])?,
        low: parse_finite(&raw.lows[i])?,
        close: parse_finite(&raw.closes[i])?,
        volume: volume.round() as u64,
    })
}

/// Parse the leading `YYYY-MM-DD` of a date string to epoch millis (UTC midnight).
fn parse_date_millis(val: &Value) -> Option<i64> {
    let s = val.as_str()?.trim();
    let day = s.get(..10).unwrap_or(s);
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

/// The API sends numbers, but hand-edited or cached payloads may carry strings.
fn parse_finite(val: &Value) -> Option<f64> {
    let n = match val {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
