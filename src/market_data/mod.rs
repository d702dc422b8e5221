pub mod series;

// Re-export the series types for convenient access (e.g. `use crate::market_data::ValidatedSeries`).
pub use series::{validate, OhlcvPoint, RawSeriesPayload, ValidatedSeries};
