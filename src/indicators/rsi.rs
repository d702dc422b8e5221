// =============================================================================
// Relative Strength Index (RSI) — trailing simple average
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — At each index, average the `period` most recent gains and losses
//          with a plain arithmetic mean (recomputed per index, no Wilder
//          smoothing).
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// avg_loss == 0 makes RS unbounded; RSI is clamped to 100.0 in that case.
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

use crate::error::ChartError;
use crate::indicators::IndicatorSeries;
use crate::market_data::ValidatedSeries;
use crate::types::SeriesKey;

pub const DEFAULT_PERIOD: usize = 14;
pub const OVERBOUGHT: f64 = 70.0;
pub const OVERSOLD: f64 = 30.0;

/// Compute the RSI series for the given `closes` and `period`.
///
/// The returned vector is index-aligned with `closes`. Slot `i` holds a value
/// once `period` deltas ending at `i` exist, i.e. for `i >= period`.
///
/// # Edge cases
/// - `period == 0` => every slot is `None`
/// - `closes.len() < period + 1` => every slot is `None`
/// - no down moves in the window => 100.0
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return result;
    }

    // deltas[j] = closes[j + 1] - closes[j]
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    for i in period..closes.len() {
        let (sum_gain, sum_loss) =
            deltas[i - period..i]
                .iter()
                .fold((0.0_f64, 0.0_f64), |(g, l), &d| {
                    if d > 0.0 {
                        (g + d, l)
                    } else {
                        (g, l + d.abs())
                    }
                });

        result[i] = rsi_from_averages(sum_gain / period_f, sum_loss / period_f);
    }

    result
}

/// RSI of the closing price, keyed as [`SeriesKey::Rsi`].
pub fn rsi_series(series: &ValidatedSeries, period: usize) -> Result<IndicatorSeries, ChartError> {
    IndicatorSeries::from_values(
        SeriesKey::Rsi,
        &series.timestamps(),
        calculate_rsi(&series.closes(), period),
    )
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// Returns `None` when the inputs are not finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }

    let rsi = if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi.clamp(0.0, 100.0))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        assert_eq!(calculate_rsi(&[1.0, 2.0, 3.0], 0), vec![None, None, None]);
    }

    #[test]
    fn rsi_insufficient_data() {
        // Need period+1 closes. 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, 14).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_all_gains_clamps_to_100() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 20);
        for (i, v) in series.iter().enumerate() {
            if i < 14 {
                assert!(v.is_none(), "index {i} should be absent");
            } else {
                assert_eq!(*v, Some(100.0), "index {i}");
            }
        }
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_has_no_losses() {
        let series = calculate_rsi(&[100.0; 20], 14);
        assert_eq!(series[14], Some(100.0));
    }

    #[test]
    fn rsi_simple_average_known_value() {
        // Deltas +2, -1, +1, -2 => window of 4: gain 3/4, loss 3/4 => RSI 50.
        let closes = vec![10.0, 12.0, 11.0, 12.0, 10.0];
        let series = calculate_rsi(&closes, 4);
        assert!((series[4].unwrap() - 50.0).abs() < 1e-10);

        // Window of 2 at index 2: deltas +2, -1 => RS 2 => RSI 66.67.
        let series = calculate_rsi(&closes, 2);
        assert!((series[2].unwrap() - 200.0 / 3.0).abs() < 1e-10);
        // Index 3: deltas -1, +1 => RSI 50.
        assert!((series[3].unwrap() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for period in 1..closes.len() {
            for v in calculate_rsi(&closes, period).into_iter().flatten() {
                assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
            }
        }
    }
}
