// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Requests that change symbol or period
// start a fetch in the background and answer `202 Accepted` with the request
// generation; the result arrives through `GET /api/v1/chart` or the
// WebSocket feed. Chart type and indicator changes redraw synchronously.
//
// CORS is configured permissively for the browser front end.
// =============================================================================

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::chart_state::FetchTicket;
use crate::types::{ChartType, IndicatorKind, Period};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/chart", get(chart))
        .route("/api/v1/chart/symbol", post(set_symbol))
        .route("/api/v1/chart/period", post(set_period))
        .route("/api/v1/chart/chart-type", post(set_chart_type))
        .route("/api/v1/chart/indicators/:kind/toggle", post(toggle_indicator))
        // ── WebSocket (handled separately in ws module but mounted here) ─
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

/// Trim and upper-case a user-entered ticker; `None` if nothing is left.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    (!symbol.is_empty()).then_some(symbol)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    };
    Json(resp)
}

// =============================================================================
// Chart snapshot
// =============================================================================

async fn chart(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Refetching changes (symbol, period)
// =============================================================================

#[derive(Serialize)]
struct FetchAccepted {
    generation: u64,
    symbol: String,
    period: Period,
}

impl From<&FetchTicket> for FetchAccepted {
    fn from(ticket: &FetchTicket) -> Self {
        Self {
            generation: ticket.generation,
            symbol: ticket.request.symbol.clone(),
            period: ticket.request.period,
        }
    }
}

#[derive(Deserialize)]
struct SymbolRequest {
    symbol: String,
}

async fn set_symbol(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SymbolRequest>,
) -> Response {
    let Some(symbol) = normalize_symbol(&req.symbol) else {
        return error_response(StatusCode::BAD_REQUEST, "symbol must not be empty");
    };

    let ticket = state.request_symbol(symbol);
    info!(request = %ticket.request, generation = ticket.generation, "symbol change requested");
    let body = FetchAccepted::from(&ticket);
    state.spawn_fetch(ticket);
    (StatusCode::ACCEPTED, Json(body)).into_response()
}

#[derive(Deserialize)]
struct PeriodRequest {
    period: String,
}

async fn set_period(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PeriodRequest>,
) -> Response {
    let period = match Period::from_str(&req.period) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let ticket = state.request_period(period);
    info!(request = %ticket.request, generation = ticket.generation, "period change requested");
    let body = FetchAccepted::from(&ticket);
    state.spawn_fetch(ticket);
    (StatusCode::ACCEPTED, Json(body)).into_response()
}

// =============================================================================
// Local changes (chart type, indicators)
// =============================================================================

#[derive(Deserialize)]
struct ChartTypeRequest {
    chart_type: String,
}

async fn set_chart_type(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChartTypeRequest>,
) -> Response {
    let chart_type = match ChartType::from_str(&req.chart_type) {
        Ok(t) => t,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.set_chart_type(chart_type) {
        Ok(()) => Json(state.build_snapshot()).into_response(),
        Err(e) => {
            warn!(error = %e, chart_type = %chart_type, "chart type change failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn toggle_indicator(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Response {
    let kind = match IndicatorKind::from_str(&kind) {
        Ok(k) => k,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.toggle_indicator(kind) {
        Ok(()) => Json(state.build_snapshot()).into_response(),
        Err(e) => {
            warn!(error = %e, indicator = %kind, "indicator toggle failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_feed::{DataFetcher, FetchRequest};
    use crate::error::FetchError;
    use crate::market_data::RawSeriesPayload;
    use crate::runtime_config::RuntimeConfig;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct Offline;

    #[async_trait]
    impl DataFetcher for Offline {
        async fn fetch(&self, _request: &FetchRequest) -> Result<RawSeriesPayload, FetchError> {
            Err(FetchError::transport("offline"))
        }
    }

    fn app() -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(RuntimeConfig::default(), Arc::new(Offline)));
        (router(state.clone()), state)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        assert_eq!(normalize_symbol("  msft "), Some("MSFT".to_string()));
        assert_eq!(normalize_symbol("   "), None);
        assert_eq!(normalize_symbol(""), None);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = app();
        let resp = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn blank_symbol_is_rejected() {
        let (app, state) = app();
        let generation = state.build_snapshot().generation;
        let resp = app
            .oneshot(post_json("/api/v1/chart/symbol", serde_json::json!({ "symbol": "  " })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.build_snapshot().generation, generation);
    }

    #[tokio::test]
    async fn symbol_change_is_accepted_with_generation() {
        let (app, state) = app();
        let resp = app
            .oneshot(post_json("/api/v1/chart/symbol", serde_json::json!({ "symbol": "tsla" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body = body_json(resp).await;
        assert_eq!(body["symbol"], "TSLA");
        assert_eq!(body["generation"], 1);
        assert_eq!(state.chart_config().symbol, "TSLA");
    }

    #[tokio::test]
    async fn unknown_period_is_rejected() {
        let (app, _) = app();
        let resp = app
            .oneshot(post_json("/api/v1/chart/period", serde_json::json!({ "period": "7W" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn toggle_updates_config() {
        let (app, state) = app();
        let resp = app
            .clone()
            .oneshot(post_json("/api/v1/chart/indicators/rsi/toggle", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.chart_config().enabled_indicators.contains(&IndicatorKind::Rsi));

        let resp = app
            .oneshot(post_json("/api/v1/chart/indicators/macd/toggle", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chart_type_change_is_reflected_in_snapshot() {
        let (app, _) = app();
        let resp = app
            .oneshot(post_json(
                "/api/v1/chart/chart-type",
                serde_json::json!({ "chart_type": "area" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["config"]["chart_type"], "area");
    }
}
