// =============================================================================
// Render targets — construct / dispose seam to the charting backend
// =============================================================================
//
// The coordinator never looks inside a backend: it asks a `RenderTarget` to
// construct an instance from a description and later disposes the handle it
// got back. `dispose` consumes the handle, so a handle cannot be disposed
// twice.
//
// `PublishTarget` is the backend used by the service: the live chart is
// published into a shared slot that the REST and WebSocket layers read.
// =============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::ChartError;
use crate::render::ChartDescription;

pub trait ChartHandle {
    fn id(&self) -> &str;
    fn dispose(self);
}

pub trait RenderTarget {
    type Handle: ChartHandle;

    fn construct(&mut self, description: &ChartDescription) -> Result<Self::Handle, ChartError>;
}

/// The chart currently shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct LiveChart {
    pub instance_id: String,
    pub created_at: i64,
    pub description: ChartDescription,
}

pub type ChartSlot = Arc<RwLock<Option<LiveChart>>>;

pub struct PublishTarget {
    slot: ChartSlot,
}

impl PublishTarget {
    pub fn new(slot: ChartSlot) -> Self {
        Self { slot }
    }
}

impl RenderTarget for PublishTarget {
    type Handle = PublishedChart;

    fn construct(&mut self, description: &ChartDescription) -> Result<PublishedChart, ChartError> {
        let mut slot = self.slot.write();
        if let Some(live) = slot.as_ref() {
            return Err(ChartError::Render(format!(
                "instance {} is still live",
                live.instance_id
            )));
        }

        let instance_id = Uuid::new_v4().to_string();
        *slot = Some(LiveChart {
            instance_id: instance_id.clone(),
            created_at: chrono::Utc::now().timestamp_millis(),
            description: description.clone(),
        });
        debug!(instance_id = %instance_id, symbol = %description.symbol, "chart instance published");

        Ok(PublishedChart {
            id: instance_id,
            slot: self.slot.clone(),
        })
    }
}

/// Handle to a published chart; disposing it empties the slot.
pub struct PublishedChart {
    id: String,
    slot: ChartSlot,
}

impl ChartHandle for PublishedChart {
    fn id(&self) -> &str {
        &self.id
    }

    fn dispose(self) {
        let mut slot = self.slot.write();
        if slot.as_ref().is_some_and(|live| live.instance_id == self.id) {
            *slot = None;
        }
        debug!(instance_id = %self.id, "chart instance disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::description::BaseDataset;
    use crate::types::{ChartType, Period};

    fn description() -> ChartDescription {
        ChartDescription {
            symbol: "AAPL".to_string(),
            period: Period::OneMonth,
            chart_type: ChartType::Line,
            base: BaseDataset::Line { points: Vec::new() },
            overlays: Vec::new(),
            axes: Vec::new(),
        }
    }

    #[test]
    fn publish_and_dispose() {
        let slot: ChartSlot = Arc::new(RwLock::new(None));
        let mut target = PublishTarget::new(slot.clone());

        let handle = target.construct(&description()).unwrap();
        assert_eq!(slot.read().as_ref().unwrap().instance_id, handle.id());

        handle.dispose();
        assert!(slot.read().is_none());
    }

    #[test]
    fn refuses_second_live_instance() {
        let slot: ChartSlot = Arc::new(RwLock::new(None));
        let mut target = PublishTarget::new(slot);
        let _first = target.construct(&description()).unwrap();
        assert!(matches!(
            target.construct(&description()),
            Err(ChartError::Render(_))
        ));
    }
}
