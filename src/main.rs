// =============================================================================
// Quote Chart — Main Entry Point
// =============================================================================
//
// Loads config, builds the shared state, requests the initial chart, serves
// the REST/WebSocket API and keeps the chart fresh on a timer. The current
// selection is written back to the config file on Ctrl+C.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod chart_state;
mod data_feed;
mod error;
mod formatting;
mod indicators;
mod market_data;
mod render;
mod runtime_config;
mod session;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::data_feed::HttpDataFetcher;
use crate::runtime_config::RuntimeConfig;

const CONFIG_PATH: &str = "quote_chart.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Quote Chart starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();

    info!(
        api = %config.api_base_url,
        symbol = %config.default_symbol,
        period = %config.default_period,
        auto_refresh_secs = config.auto_refresh_secs,
        "Configuration resolved"
    );

    // ── 2. Data fetcher & shared state ───────────────────────────────────
    let fetcher = HttpDataFetcher::new(
        config.api_base_url.clone(),
        config.api_token.clone(),
        config.request_timeout(),
    )
    .context("failed to build quote API client")?;

    let bind_addr = config.bind_addr.clone();
    let refresh_every = config.auto_refresh_interval();
    let state = Arc::new(AppState::new(config, Arc::new(fetcher)));

    // ── 3. Initial chart ─────────────────────────────────────────────────
    let initial = state.chart_config();
    let ticket = state.request_symbol(initial.symbol);
    state.spawn_fetch(ticket);

    // ── 4. API server ────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // ── 5. Auto-refresh loop ─────────────────────────────────────────────
    if let Some(every) = refresh_every {
        let refresh_state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick fires immediately; the initial fetch covers it.
            interval.tick().await;
            loop {
                interval.tick().await;
                if refresh_state.auto_refresh_tick().await.is_none() {
                    debug!("Auto-refresh skipped, chart not ready");
                }
            }
        });
        info!(every_secs = every.as_secs(), "Auto-refresh enabled");
    } else {
        info!("Auto-refresh disabled");
    }

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping gracefully");

    state.remember_selection();
    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Quote Chart shut down complete.");
    Ok(())
}
