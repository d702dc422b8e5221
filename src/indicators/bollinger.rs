// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ). σ is the population standard deviation of the
// same window (divide by `period`, not `period - 1`).
//
// The middle band is the SMA series itself, so it matches `calculate_sma`
// bit for bit. σ is computed on the window scaled by its largest magnitude,
// which keeps it finite for any finite closes.

use crate::error::ChartError;
use crate::indicators::sma::calculate_sma;
use crate::indicators::IndicatorSeries;
use crate::market_data::ValidatedSeries;
use crate::types::SeriesKey;

/// Default band width in standard deviations.
pub const DEFAULT_NUM_STD: f64 = 2.0;

/// Index-aligned band values. Upper and lower are `None` wherever the middle
/// band is, and also where `mean ± k*σ` leaves the f64 range.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands for the given closing prices.
///
/// A slot is `None` in all three bands when the window is not yet full.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = calculate_sma(closes, period);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    for i in 0..middle.len() {
        let Some(mean) = middle[i] else {
            continue;
        };

        let std_dev = population_std_dev(&closes[i + 1 - period..=i], mean);
        let band = num_std * std_dev;
        upper[i] = Some(mean + band).filter(|v| v.is_finite());
        lower[i] = Some(mean - band).filter(|v| v.is_finite());
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Population σ of `window` around `mean`, squared on `x / max|x|` so the
/// squares cannot overflow.
fn population_std_dev(window: &[f64], mean: f64) -> f64 {
    let scale = window.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if scale == 0.0 {
        return 0.0;
    }

    let scaled_mean = mean / scale;
    let variance = window
        .iter()
        .map(|x| (x / scale - scaled_mean).powi(2))
        .sum::<f64>()
        / window.len() as f64;
    scale * variance.sqrt()
}

/// Bollinger Bands of the closing price as three keyed series
/// (upper, middle, lower).
pub fn bollinger_series(
    series: &ValidatedSeries,
    period: usize,
    num_std: f64,
) -> Result<Vec<IndicatorSeries>, ChartError> {
    let timestamps = series.timestamps();
    let bands = calculate_bollinger(&series.closes(), period, num_std);

    Ok(vec![
        IndicatorSeries::from_values(SeriesKey::BbUpper, &timestamps, bands.upper)?,
        IndicatorSeries::from_values(SeriesKey::BbMiddle, &timestamps, bands.middle)?,
        IndicatorSeries::from_values(SeriesKey::BbLower, &timestamps, bands.lower)?,
    ])
}
