// =============================================================================
// Chart Description — renderer-agnostic picture of one chart
// =============================================================================
//
// Base dataset shaped by chart type, one overlay per derived series, and the
// axes those overlays are assigned to. MA and Bollinger share the price axis;
// volume and RSI each get their own because their ranges have nothing in
// common with price.
// =============================================================================

use serde::Serialize;

use crate::chart_state::ChartConfig;
use crate::error::ChartError;
use crate::formatting::{format_price, format_volume};
use crate::indicators::{self, rsi, IndicatorParams, IndicatorPoint};
use crate::market_data::ValidatedSeries;
use crate::types::{ChartType, IndicatorKind, Period, SeriesKey};

const PRICE_TICKS: usize = 5;
const VOLUME_TICKS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandlePoint {
    pub x: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinePoint {
    pub x: i64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BaseDataset {
    Candlestick { points: Vec<CandlePoint> },
    Line { points: Vec<LinePoint> },
    Area { points: Vec<LinePoint> },
}

impl BaseDataset {
    pub fn from_series(chart_type: ChartType, series: &ValidatedSeries) -> Self {
        match chart_type {
            ChartType::Candlestick => Self::Candlestick {
                points: series
                    .points()
                    .iter()
                    .map(|p| CandlePoint {
                        x: p.timestamp,
                        open: p.open,
                        high: p.high,
                        low: p.low,
                        close: p.close,
                    })
                    .collect(),
            },
            ChartType::Line => Self::Line {
                points: close_points(series),
            },
            ChartType::Area => Self::Area {
                points: close_points(series),
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Candlestick { points } => points.len(),
            Self::Line { points } | Self::Area { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (min, max) of every plotted price.
    fn price_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Candlestick { points } => {
                span(points.iter().flat_map(|p| [p.low, p.high]))
            }
            Self::Line { points } | Self::Area { points } => span(points.iter().map(|p| p.y)),
        }
    }
}

fn close_points(series: &ValidatedSeries) -> Vec<LinePoint> {
    series
        .points()
        .iter()
        .map(|p| LinePoint {
            x: p.timestamp,
            y: p.close,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisId {
    Price,
    Volume,
    Rsi,
}

impl AxisId {
    pub fn for_indicator(kind: IndicatorKind) -> Self {
        match kind {
            IndicatorKind::Ma | IndicatorKind::Bb => Self::Price,
            IndicatorKind::Vol => Self::Volume,
            IndicatorKind::Rsi => Self::Rsi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisPosition {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub id: AxisId,
    pub position: AxisPosition,
    pub min: f64,
    pub max: f64,
    pub ticks: Vec<AxisTick>,
    /// Horizontal reference lines (RSI overbought/oversold).
    pub guides: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub key: SeriesKey,
    pub indicator: IndicatorKind,
    pub axis: AxisId,
    pub points: Vec<IndicatorPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDescription {
    pub symbol: String,
    pub period: Period,
    pub chart_type: ChartType,
    pub base: BaseDataset,
    pub overlays: Vec<Overlay>,
    pub axes: Vec<Axis>,
}

impl ChartDescription {
    /// Build the description for `config` over `series`.
    ///
    /// # Errors
    /// `ChartError::IndicatorCompute` if an overlay does not line up with the
    /// base dataset.
    pub fn build(
        config: &ChartConfig,
        series: &ValidatedSeries,
        params: &IndicatorParams,
    ) -> Result<Self, ChartError> {
        let base = BaseDataset::from_series(config.chart_type, series);

        let mut overlays = Vec::new();
        for &kind in &config.enabled_indicators {
            let axis = AxisId::for_indicator(kind);
            for computed in indicators::compute(kind, series, params)? {
                if computed.len() != base.len() {
                    return Err(ChartError::IndicatorCompute {
                        key: computed.key,
                        expected: base.len(),
                        actual: computed.len(),
                    });
                }
                overlays.push(Overlay {
                    key: computed.key,
                    indicator: kind,
                    axis,
                    points: computed.points,
                });
            }
        }

        let axes = build_axes(&base, &overlays);

        Ok(Self {
            symbol: config.symbol.clone(),
            period: config.period,
            chart_type: config.chart_type,
            base,
            overlays,
            axes,
        })
    }

    pub fn overlay_keys(&self) -> Vec<SeriesKey> {
        self.overlays.iter().map(|o| o.key).collect()
    }

    pub fn axis(&self, id: AxisId) -> Option<&Axis> {
        self.axes.iter().find(|a| a.id == id)
    }
}

// =============================================================================
// Axis construction
// =============================================================================

/// Every present value plotted against `axis`.
fn axis_values(overlays: &[Overlay], axis: AxisId) -> impl Iterator<Item = f64> + '_ {
    overlays
        .iter()
        .filter(move |o| o.axis == axis)
        .flat_map(|o| o.points.iter().filter_map(|p| p.value))
}

fn build_axes(base: &BaseDataset, overlays: &[Overlay]) -> Vec<Axis> {
    let price_span = merge(base.price_range(), span(axis_values(overlays, AxisId::Price)));
    let (min, max) = price_span.unwrap_or((0.0, 0.0));
    let mut axes = vec![Axis {
        id: AxisId::Price,
        position: AxisPosition::Right,
        min,
        max,
        ticks: even_ticks(min, max, PRICE_TICKS, format_price),
        guides: Vec::new(),
    }];

    if overlays.iter().any(|o| o.axis == AxisId::Volume) {
        let max = span(axis_values(overlays, AxisId::Volume)).map_or(0.0, |(_, hi)| hi);
        axes.push(Axis {
            id: AxisId::Volume,
            position: AxisPosition::Left,
            min: 0.0,
            max,
            ticks: even_ticks(0.0, max, VOLUME_TICKS, format_volume),
            guides: Vec::new(),
        });
    }

    if overlays.iter().any(|o| o.axis == AxisId::Rsi) {
        axes.push(Axis {
            id: AxisId::Rsi,
            position: AxisPosition::Right,
            min: 0.0,
            max: 100.0,
            ticks: [0.0, rsi::OVERSOLD, 50.0, rsi::OVERBOUGHT, 100.0]
                .into_iter()
                .map(|value| AxisTick {
                    value,
                    label: format!("{value:.0}"),
                })
                .collect(),
            guides: vec![rsi::OVERSOLD, rsi::OVERBOUGHT],
        });
    }

    axes
}

fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn merge(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some((a_lo, a_hi)), Some((b_lo, b_hi))) => Some((a_lo.min(b_lo), a_hi.max(b_hi))),
        (a, None) => a,
        (None, b) => b,
    }
}

fn even_ticks(min: f64, max: f64, count: usize, label: fn(f64) -> String) -> Vec<AxisTick> {
    if max <= min || count < 2 {
        return vec![AxisTick {
            value: min,
            label: label(min),
        }];
    }

    let step = (max - min) / (count - 1) as f64;
    (0..count)
        .map(|i| {
            let value = min + step * i as f64;
            AxisTick {
                value,
                label: label(value),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::OhlcvPoint;
    use std::collections::BTreeSet;

    fn series(n: usize) -> ValidatedSeries {
        let points = (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                OhlcvPoint {
                    timestamp: i as i64 * 86_400_000,
                    open: c - 0.5,
                    high: c + 1.0,
                    low: c - 1.0,
                    close: c,
                    volume: 1_000 * (i as u64 + 1),
                }
            })
            .collect();
        ValidatedSeries::from_points(points)
    }

    fn config(chart_type: ChartType, indicators: &[IndicatorKind]) -> ChartConfig {
        ChartConfig {
            symbol: "AAPL".to_string(),
            period: Period::SixMonths,
            chart_type,
            enabled_indicators: indicators.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn candlestick_carries_ohlc() {
        let desc =
            ChartDescription::build(&config(ChartType::Candlestick, &[]), &series(3), &IndicatorParams::default())
                .unwrap();
        match &desc.base {
            BaseDataset::Candlestick { points } => {
                assert_eq!(points.len(), 3);
                assert!((points[1].high - 102.0).abs() < 1e-10);
                assert!((points[1].open - 100.5).abs() < 1e-10);
            }
            other => panic!("expected candlestick, got {other:?}"),
        }
        assert!(desc.overlays.is_empty());
        assert_eq!(desc.axes.len(), 1);
    }

    #[test]
    fn line_and_area_use_close_only() {
        let s = series(3);
        for chart_type in [ChartType::Line, ChartType::Area] {
            let desc =
                ChartDescription::build(&config(chart_type, &[]), &s, &IndicatorParams::default()).unwrap();
            let points = match &desc.base {
                BaseDataset::Line { points } | BaseDataset::Area { points } => points,
                other => panic!("unexpected base {other:?}"),
            };
            assert!((points[2].y - 102.0).abs() < 1e-10);
        }
    }

    #[test]
    fn overlays_assigned_to_axes() {
        let desc = ChartDescription::build(
            &config(
                ChartType::Line,
                &[IndicatorKind::Vol, IndicatorKind::Ma, IndicatorKind::Bb, IndicatorKind::Rsi],
            ),
            &series(30),
            &IndicatorParams::default(),
        )
        .unwrap();

        let axis_of = |key: SeriesKey| desc.overlays.iter().find(|o| o.key == key).unwrap().axis;
        assert_eq!(axis_of(SeriesKey::Ma), AxisId::Price);
        assert_eq!(axis_of(SeriesKey::BbUpper), AxisId::Price);
        assert_eq!(axis_of(SeriesKey::BbLower), AxisId::Price);
        assert_eq!(axis_of(SeriesKey::Volume), AxisId::Volume);
        assert_eq!(axis_of(SeriesKey::Rsi), AxisId::Rsi);

        assert_eq!(desc.axes.len(), 3);
        let rsi_axis = desc.axis(AxisId::Rsi).unwrap();
        assert_eq!(rsi_axis.guides, vec![30.0, 70.0]);
        let volume_axis = desc.axis(AxisId::Volume).unwrap();
        assert!((volume_axis.max - 30_000.0).abs() < 1e-10);
        assert_eq!(volume_axis.ticks.last().unwrap().label, "30.00K");
    }

    #[test]
    fn price_axis_spans_bollinger_envelope() {
        let desc = ChartDescription::build(
            &config(ChartType::Line, &[IndicatorKind::Bb]),
            &series(30),
            &IndicatorParams::default(),
        )
        .unwrap();
        let price = desc.axis(AxisId::Price).unwrap();
        let upper_max = desc
            .overlays
            .iter()
            .find(|o| o.key == SeriesKey::BbUpper)
            .unwrap()
            .points
            .iter()
            .filter_map(|p| p.value)
            .fold(f64::MIN, f64::max);
        assert!(price.max >= upper_max);
        assert_eq!(price.ticks.len(), 5);
        assert!(desc.axis(AxisId::Volume).is_none());
    }

    #[test]
    fn overlays_are_index_aligned_with_base() {
        let desc = ChartDescription::build(
            &config(ChartType::Candlestick, &[IndicatorKind::Ma, IndicatorKind::Rsi]),
            &series(25),
            &IndicatorParams::default(),
        )
        .unwrap();
        for overlay in &desc.overlays {
            assert_eq!(overlay.points.len(), desc.base.len());
        }
    }

    #[test]
    fn even_ticks_degenerate_range() {
        let ticks = even_ticks(5.0, 5.0, 5, format_price);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].label, "5.00");
    }
}
