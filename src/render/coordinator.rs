// =============================================================================
// Render Coordinator — sole owner of the live chart instance
// =============================================================================
//
// Every render disposes the previous instance first, then either constructs a
// new one or settles on the "no data" placeholder. Error paths return with
// zero live instances.
// =============================================================================

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chart_state::ChartConfig;
use crate::error::ChartError;
use crate::indicators::IndicatorParams;
use crate::market_data::ValidatedSeries;
use crate::render::{ChartDescription, ChartHandle, RenderTarget};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenderOutcome {
    Drawn { instance_id: String },
    NoData,
}

/// Lifetime construct/dispose counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub constructed: u64,
    pub disposed: u64,
}

impl RenderStats {
    pub fn live(&self) -> u64 {
        self.constructed - self.disposed
    }
}

pub struct RenderCoordinator<T: RenderTarget> {
    target: T,
    current: Option<T::Handle>,
    params: IndicatorParams,
    stats: RenderStats,
}

impl<T: RenderTarget> RenderCoordinator<T> {
    pub fn new(target: T, params: IndicatorParams) -> Self {
        Self {
            target,
            current: None,
            params,
            stats: RenderStats::default(),
        }
    }

    /// Replace the live chart with one drawn from `config` over `series`.
    ///
    /// # Errors
    /// Indicator or construction failures; the previous instance is already
    /// disposed and no new one exists.
    pub fn render(
        &mut self,
        config: &ChartConfig,
        series: &ValidatedSeries,
    ) -> Result<RenderOutcome, ChartError> {
        self.clear();

        let description = ChartDescription::build(config, series, &self.params)?;
        if description.base.is_empty() {
            info!(symbol = %config.symbol, "no data to draw — showing placeholder");
            return Ok(RenderOutcome::NoData);
        }

        let handle = self.target.construct(&description).map_err(|e| {
            warn!(error = %e, "chart construction failed");
            e
        })?;

        let instance_id = handle.id().to_string();
        self.current = Some(handle);
        self.stats.constructed += 1;

        debug!(
            instance_id = %instance_id,
            chart_type = %config.chart_type,
            overlays = description.overlays.len(),
            "chart rendered"
        );
        Ok(RenderOutcome::Drawn { instance_id })
    }

    /// Dispose the live instance, if any.
    pub fn clear(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.dispose();
            self.stats.disposed += 1;
        }
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|h| h.id())
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }
}

impl<T: RenderTarget> Drop for RenderCoordinator<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
