// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Unweighted mean of the trailing `period` closes:
//   SMA_i = (close_{i-period+1} + ... + close_i) / period
//
// Output is index-aligned with the input; the first `period - 1` slots are
// `None` because the window is not yet full.
// =============================================================================

use crate::error::ChartError;
use crate::indicators::IndicatorSeries;
use crate::market_data::ValidatedSeries;
use crate::types::SeriesKey;

/// Compute the SMA of `values` over `period`.
///
/// # Edge cases
/// - `period == 0` or `values.len() < period` => every slot is `None`
/// - empty input => empty output
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let period_f = period as f64;
    for (start, window) in values.windows(period).enumerate() {
        let mean = window.iter().sum::<f64>() / period_f;
        result[start + period - 1] = mean.is_finite().then_some(mean);
    }

    result
}

/// SMA of the closing price, keyed as [`SeriesKey::Ma`].
pub fn sma_series(series: &ValidatedSeries, period: usize) -> Result<IndicatorSeries, ChartError> {
    IndicatorSeries::from_values(
        SeriesKey::Ma,
        &series.timestamps(),
        calculate_sma(&series.closes(), period),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_empty_input() {
        assert!(calculate_sma(&[], 3).is_empty());
    }

    #[test]
    fn sma_period_zero_is_all_absent() {
        let out = calculate_sma(&[1.0, 2.0, 3.0], 0);
        assert_eq!(out, vec![None, None, None]);
    }

    #[test]
    fn sma_flat_series() {
        let out = calculate_sma(&[10.0; 5], 3);
        assert_eq!(out, vec![None, None, Some(10.0), Some(10.0), Some(10.0)]);
    }

    #[test]
    fn sma_known_values() {
        let closes: Vec<f64> = (1..=6).map(|x| x as f64).collect();
        let out = calculate_sma(&closes, 3);
        let expected = [None, None, Some(2.0), Some(3.0), Some(4.0), Some(5.0)];
        for (a, b) in out.iter().zip(expected.iter()) {
            match (a, b) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-10, "got {a}, expected {b}"),
                (None, None) => {}
                _ => panic!("absence mismatch: {a:?} vs {b:?}"),
            }
        }
    }

    #[test]
    fn sma_absent_prefix_length() {
        for n in 1..30usize {
            let values: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin() + 5.0).collect();
            for p in 1..=n {
                let out = calculate_sma(&values, p);
                assert_eq!(out.len(), n);
                let leading = out.iter().take_while(|v| v.is_none()).count();
                assert_eq!(leading, p - 1);
                assert_eq!(out.iter().filter(|v| v.is_some()).count(), n - p + 1);
            }
        }
    }

    #[test]
    fn sma_longer_period_than_data() {
        assert_eq!(calculate_sma(&[1.0, 2.0], 5), vec![None, None]);
    }
}
