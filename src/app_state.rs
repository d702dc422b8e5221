// =============================================================================
// Central Application State — Quote Chart service
// =============================================================================
//
// Ties the chart session, the published chart slot, the data fetcher and the
// runtime config together, and provides a unified snapshot for the REST API
// and WebSocket feed.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot locks for everything mutable. The session mutex is never
//     held across an await: fetches run between `request_*` and
//     `complete_fetch`, outside the lock.
//   - Lock order is session -> live_chart; snapshots read them one at a time.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{info, warn};

use crate::chart_state::{ChartConfig, ChartPhase, FetchTicket};
use crate::data_feed::DataFetcher;
use crate::error::ChartError;
use crate::render::{ChartSlot, LiveChart, PublishTarget, RenderOutcome, RenderStats};
use crate::runtime_config::RuntimeConfig;
use crate::session::{ChartSession, FetchOutcome};
use crate::types::{ChartType, IndicatorKind, Period};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the client error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// HTTP status from the quote API, when there was one.
    pub status: Option<u16>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented on every meaningful state mutation. The WebSocket feed
    /// uses this to detect changes and push updates.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Chart ───────────────────────────────────────────────────────────
    session: Mutex<ChartSession<PublishTarget>>,
    pub live_chart: ChartSlot,
    fetcher: Arc<dyn DataFetcher>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig, fetcher: Arc<dyn DataFetcher>) -> Self {
        let live_chart: ChartSlot = Arc::new(RwLock::new(None));
        let session = ChartSession::new(
            config.initial_chart(),
            PublishTarget::new(live_chart.clone()),
            config.indicator_params,
        );

        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            runtime_config: Arc::new(RwLock::new(config)),
            session: Mutex::new(session),
            live_chart,
            fetcher,
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, msg: String) {
        self.push_error_with_status(msg, None);
    }

    pub fn push_error_with_status(&self, msg: String, status: Option<u16>) {
        let record = ErrorRecord {
            message: msg,
            status,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Chart requests ──────────────────────────────────────────────────

    /// Switch symbol. Returns the ticket the caller must run through
    /// [`AppState::run_fetch`].
    pub fn request_symbol(&self, symbol: impl Into<String>) -> FetchTicket {
        let ticket = self.session.lock().request_symbol(symbol);
        self.increment_version();
        ticket
    }

    pub fn request_period(&self, period: Period) -> FetchTicket {
        let ticket = self.session.lock().request_period(period);
        self.increment_version();
        ticket
    }

    pub fn set_chart_type(&self, chart_type: ChartType) -> Result<(), ChartError> {
        let result = self.session.lock().set_chart_type(chart_type);
        self.after_local_change(result)
    }

    pub fn toggle_indicator(&self, kind: IndicatorKind) -> Result<(), ChartError> {
        let result = self.session.lock().toggle_indicator(kind);
        self.after_local_change(result)
    }

    fn after_local_change(&self, result: Result<(), ChartError>) -> Result<(), ChartError> {
        if let Err(e) = &result {
            self.push_error(format!("redraw failed: {e}"));
        }
        self.increment_version();
        result
    }

    /// Perform the fetch for `ticket` and hand the result to the session.
    pub async fn run_fetch(&self, ticket: FetchTicket) -> FetchOutcome {
        let result = self.fetcher.fetch(&ticket.request).await;
        let status = result.as_ref().err().and_then(|e| e.status);

        let outcome = self.session.lock().complete_fetch(ticket.generation, result);

        match &outcome {
            FetchOutcome::Applied { render } => {
                info!(request = %ticket.request, render = ?render, "chart updated");
            }
            FetchOutcome::Failed { message } => {
                warn!(request = %ticket.request, error = %message, "chart load failed");
                self.push_error_with_status(format!("{}: {message}", ticket.request), status);
            }
            FetchOutcome::Stale => {}
        }

        self.increment_version();
        outcome
    }

    /// Fire-and-forget variant of [`AppState::run_fetch`].
    pub fn spawn_fetch(self: &Arc<Self>, ticket: FetchTicket) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            state.run_fetch(ticket).await;
        });
    }

    /// Re-request the current chart if it is Ready; `None` otherwise.
    pub async fn auto_refresh_tick(&self) -> Option<FetchOutcome> {
        let ticket = self.session.lock().refresh()?;
        self.increment_version();
        Some(self.run_fetch(ticket).await)
    }

    pub fn chart_config(&self) -> ChartConfig {
        self.session.lock().config().clone()
    }

    /// Copy the current selection into the runtime config for persistence.
    pub fn remember_selection(&self) {
        let chart = self.chart_config();
        self.runtime_config.write().remember(&chart);
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Serialisable view of the whole service, for `GET /api/v1/chart` and
    /// the WebSocket push feed.
    pub fn build_snapshot(&self) -> ChartSnapshot {
        let now = Utc::now();
        let version = self.current_state_version();

        let (phase, config, generation, no_data, render_stats) = {
            let session = self.session.lock();
            (
                session.phase().clone(),
                session.config().clone(),
                session.generation(),
                matches!(session.last_render(), Some(RenderOutcome::NoData)),
                session.render_stats(),
            )
        };

        let live_chart = self.live_chart.read().clone();
        let recent_errors = self.recent_errors.read().clone();

        ChartSnapshot {
            state_version: version,
            ws_sequence_number: self.ws_sequence_number.load(Ordering::Relaxed),
            server_time: now.timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            phase,
            config,
            generation,
            no_data,
            live_chart,
            render_stats,
            recent_errors: (!recent_errors.is_empty()).then_some(recent_errors),
        }
    }
}

// =============================================================================
// Serialisable snapshot
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChartSnapshot {
    pub state_version: u64,
    /// Number of WebSocket pushes so far, this one included.
    pub ws_sequence_number: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    #[serde(flatten)]
    pub phase: ChartPhase,
    pub config: ChartConfig,
    pub generation: u64,
    /// Ready, but nothing drawable: the client shows a placeholder.
    pub no_data: bool,
    pub live_chart: Option<LiveChart>,
    pub render_stats: RenderStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_errors: Option<Vec<ErrorRecord>>,
}
