// =============================================================================
// Chart State — configuration, lifecycle phase and request generations
// =============================================================================
//
// Phases:  Idle -> Loading -> Ready -> Error
//
//   set_symbol / set_period      any phase -> Loading (new generation)
//   set_chart_type / toggle      redraw if the drawn series is still current,
//                                otherwise config only (no refetch either way)
//   complete_fetch (current gen) Loading -> Ready | Error
//   complete_fetch (old gen)     ignored
//   fail                         Ready | Loading -> Error
//
// Only the most recent request may land. Every call that enters Loading bumps
// `generation`; results tagged with anything else are stale and dropped.
// =============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data_feed::FetchRequest;
use crate::error::{ChartError, FetchError};
use crate::market_data::{validate, RawSeriesPayload, ValidatedSeries};
use crate::types::{ChartType, IndicatorKind, Period};

/// User-facing chart configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub symbol: String,
    pub period: Period,
    pub chart_type: ChartType,
    pub enabled_indicators: BTreeSet<IndicatorKind>,
}

impl ChartConfig {
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            symbol: self.symbol.clone(),
            period: self.period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum ChartPhase {
    Idle,
    Loading,
    Ready,
    Error { message: String },
}

impl std::fmt::Display for ChartPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Loading => write!(f, "Loading"),
            Self::Ready => write!(f, "Ready"),
            Self::Error { .. } => write!(f, "Error"),
        }
    }
}

/// A fetch the caller must perform; hand `generation` back to
/// [`ChartState::complete_fetch`] with the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub request: FetchRequest,
}

/// What a local reconfiguration requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconfigure {
    /// Config changed while Ready; redraw from the current series.
    Redraw,
    /// Config changed but there is nothing drawable yet.
    Deferred,
}

/// Result of handing a fetch result back to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Ready(Arc<ValidatedSeries>),
    Failed(ChartError),
    Stale,
}

#[derive(Debug)]
pub struct ChartState {
    config: ChartConfig,
    phase: ChartPhase,
    generation: u64,
    series: Option<Arc<ValidatedSeries>>,
    /// Request the current series answered.
    series_request: Option<FetchRequest>,
}

impl ChartState {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config,
            phase: ChartPhase::Idle,
            generation: 0,
            series: None,
            series_request: None,
        }
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn phase(&self) -> &ChartPhase {
        &self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Snapshot of the series the chart is currently drawn from.
    pub fn series(&self) -> Option<Arc<ValidatedSeries>> {
        self.series.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ChartPhase::Ready
    }

    // ── Refetching mutators ─────────────────────────────────────────────

    pub fn set_symbol(&mut self, symbol: impl Into<String>) -> FetchTicket {
        self.config.symbol = symbol.into();
        self.begin_loading()
    }

    pub fn set_period(&mut self, period: Period) -> FetchTicket {
        self.config.period = period;
        self.begin_loading()
    }

    /// Re-request the current symbol/period. Only allowed from Ready, so a
    /// failed chart stays failed until the user asks for something new.
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        if !self.is_ready() {
            return None;
        }
        Some(self.begin_loading())
    }

    fn begin_loading(&mut self) -> FetchTicket {
        self.generation += 1;
        if self.phase == ChartPhase::Loading {
            debug!(generation = self.generation, "superseding in-flight fetch");
        }
        self.phase = ChartPhase::Loading;

        let request = self.config.fetch_request();
        info!(generation = self.generation, request = %request, "chart loading");
        FetchTicket {
            generation: self.generation,
            request,
        }
    }

    // ── Local mutators ──────────────────────────────────────────────────

    pub fn set_chart_type(&mut self, chart_type: ChartType) -> Reconfigure {
        self.config.chart_type = chart_type;
        self.local_change()
    }

    /// Flip `kind` in the enabled set.
    pub fn toggle_indicator(&mut self, kind: IndicatorKind) -> Reconfigure {
        if !self.config.enabled_indicators.remove(&kind) {
            self.config.enabled_indicators.insert(kind);
        }
        self.local_change()
    }

    /// A refresh in flight leaves the drawn series valid for the current
    /// symbol/period, so local changes still redraw from it.
    fn local_change(&self) -> Reconfigure {
        let series_current = self.series.is_some()
            && self.series_request.as_ref() == Some(&self.config.fetch_request());
        match self.phase {
            ChartPhase::Ready => Reconfigure::Redraw,
            ChartPhase::Loading if series_current => Reconfigure::Redraw,
            _ => Reconfigure::Deferred,
        }
    }

    // ── Fetch completion ────────────────────────────────────────────────

    /// Apply a fetch result if it belongs to the latest request.
    pub fn complete_fetch(
        &mut self,
        generation: u64,
        result: Result<RawSeriesPayload, FetchError>,
    ) -> Completion {
        if generation != self.generation || self.phase != ChartPhase::Loading {
            debug!(
                generation,
                current = self.generation,
                "discarding stale fetch result"
            );
            return Completion::Stale;
        }

        match result.map_err(ChartError::from).and_then(|raw| validate(&raw)) {
            Ok(series) => {
                let series = Arc::new(series);
                info!(
                    generation,
                    symbol = %self.config.symbol,
                    bars = series.len(),
                    "chart data ready"
                );
                self.series = Some(series.clone());
                self.series_request = Some(self.config.fetch_request());
                self.phase = ChartPhase::Ready;
                Completion::Ready(series)
            }
            Err(e) => {
                self.fail(&e);
                Completion::Failed(e)
            }
        }
    }

    /// Enter the Error phase and drop the current series.
    pub fn fail(&mut self, error: &ChartError) {
        warn!(phase = %self.phase, error = %error, "chart failed");
        self.phase = ChartPhase::Error {
            message: error.to_string(),
        };
        self.series = None;
        self.series_request = None;
    }
}
