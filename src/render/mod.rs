pub mod coordinator;
pub mod description;
pub mod target;

pub use coordinator::{RenderCoordinator, RenderOutcome, RenderStats};
pub use description::ChartDescription;
pub use target::{ChartHandle, ChartSlot, LiveChart, PublishTarget, RenderTarget};
