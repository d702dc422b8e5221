// =============================================================================
// Chart Session — Chart State wired to its Render Coordinator
// =============================================================================
//
// All methods are synchronous. The async fetch happens outside, between
// `request_*` (which hands out a ticket) and `complete_fetch` (which takes
// the result back). Holding the session behind a mutex therefore never spans
// an await point.
// =============================================================================

use serde::Serialize;
use tracing::debug;

use crate::chart_state::{ChartConfig, ChartPhase, ChartState, Completion, FetchTicket, Reconfigure};
use crate::error::{ChartError, FetchError};
use crate::indicators::IndicatorParams;
use crate::market_data::RawSeriesPayload;
use crate::render::{RenderCoordinator, RenderOutcome, RenderStats, RenderTarget};
use crate::types::{ChartType, IndicatorKind, Period};

/// What happened to a fetch result handed back to the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Applied { render: RenderOutcome },
    Failed { message: String },
    Stale,
}

pub struct ChartSession<T: RenderTarget> {
    state: ChartState,
    coordinator: RenderCoordinator<T>,
    last_render: Option<RenderOutcome>,
}

impl<T: RenderTarget> ChartSession<T> {
    pub fn new(config: ChartConfig, target: T, params: IndicatorParams) -> Self {
        Self {
            state: ChartState::new(config),
            coordinator: RenderCoordinator::new(target, params),
            last_render: None,
        }
    }

    pub fn config(&self) -> &ChartConfig {
        self.state.config()
    }

    pub fn phase(&self) -> &ChartPhase {
        self.state.phase()
    }

    pub fn generation(&self) -> u64 {
        self.state.generation()
    }

    pub fn last_render(&self) -> Option<&RenderOutcome> {
        self.last_render.as_ref()
    }

    pub fn render_stats(&self) -> RenderStats {
        self.coordinator.stats()
    }

    pub fn live_instance(&self) -> Option<&str> {
        self.coordinator.current_id()
    }

    // ── Refetching requests ─────────────────────────────────────────────

    pub fn request_symbol(&mut self, symbol: impl Into<String>) -> FetchTicket {
        self.state.set_symbol(symbol)
    }

    pub fn request_period(&mut self, period: Period) -> FetchTicket {
        self.state.set_period(period)
    }

    pub fn refresh(&mut self) -> Option<FetchTicket> {
        self.state.refresh()
    }

    /// Hand a fetch result back. Stale generations are ignored; failures
    /// dispose the live chart and leave the session in Error.
    pub fn complete_fetch(
        &mut self,
        generation: u64,
        result: Result<RawSeriesPayload, FetchError>,
    ) -> FetchOutcome {
        match self.state.complete_fetch(generation, result) {
            Completion::Stale => FetchOutcome::Stale,
            Completion::Failed(e) => {
                self.coordinator.clear();
                self.last_render = None;
                FetchOutcome::Failed {
                    message: e.to_string(),
                }
            }
            Completion::Ready(_) => match self.redraw() {
                Ok(render) => FetchOutcome::Applied { render },
                Err(e) => FetchOutcome::Failed {
                    message: e.to_string(),
                },
            },
        }
    }

    // ── Local reconfiguration ───────────────────────────────────────────

    pub fn set_chart_type(&mut self, chart_type: ChartType) -> Result<(), ChartError> {
        let change = self.state.set_chart_type(chart_type);
        self.apply(change)
    }

    pub fn toggle_indicator(&mut self, kind: IndicatorKind) -> Result<(), ChartError> {
        let change = self.state.toggle_indicator(kind);
        self.apply(change)
    }

    fn apply(&mut self, change: Reconfigure) -> Result<(), ChartError> {
        match change {
            Reconfigure::Redraw => self.redraw().map(|_| ()),
            Reconfigure::Deferred => {
                debug!(phase = %self.state.phase(), "config updated, redraw deferred");
                Ok(())
            }
        }
    }

    /// Redraw from the current series snapshot.
    fn redraw(&mut self) -> Result<RenderOutcome, ChartError> {
        let Some(series) = self.state.series() else {
            return Err(ChartError::DataShape("no series loaded".to_string()));
        };

        match self.coordinator.render(self.state.config(), &series) {
            Ok(outcome) => {
                self.last_render = Some(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                self.coordinator.clear();
                self.last_render = None;
                self.state.fail(&e);
                Err(e)
            }
        }
    }
}
