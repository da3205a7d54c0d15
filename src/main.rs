// =============================================================================
// candle-dash: Main Entry Point
// =============================================================================
//
// Serves OHLCV candles, technical indicators and a chart trace model for a
// single exchange pair over HTTP. Each request refreshes through a TTL cache;
// nothing runs in the background besides the server itself.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod binance;
mod chart;
mod dashboard;
mod error;
mod indicators;
mod market_data;
mod rates;
mod runtime_config;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::binance::BinanceClient;
use crate::rates::CoinGeckoClient;
use crate::runtime_config::RuntimeConfig;

const CONFIG_PATH: &str = "dashboard_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("candle-dash starting up");

    let mut config = RuntimeConfig::load_or_default(CONFIG_PATH);
    config.apply_overrides(|key| std::env::var(key).ok());

    info!(
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        lookback_hours = config.lookback_hours,
        cache_ttl_secs = config.cache_ttl_secs,
        "Dashboard configured"
    );

    // ── 2. Data sources (constructed once, injected) ─────────────────────
    let binance = Arc::new(BinanceClient::new(
        config.binance_base_url.clone(),
        config.http_timeout(),
    )?);
    let rates = Arc::new(CoinGeckoClient::new(
        config.rates_base_url.clone(),
        config.http_timeout(),
    )?);
    let rate_limit = binance.rate_limit();

    // ── 3. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(
        AppState::new(config, binance, rates, Some(rate_limit))
            .context("invalid dashboard configuration")?,
    );

    // ── 4. Warm the cache for the default pair ───────────────────────────
    match state.resolve_key(None, None) {
        Ok(key) => match state.refresh_dashboard(&key, false).await {
            Ok(snapshot) => info!(
                key = %key,
                candles = snapshot.candles.len(),
                last_price = snapshot.last_price.price,
                "Initial refresh complete"
            ),
            Err(e) => warn!(key = %key, error = %e, "Initial refresh failed"),
        },
        Err(e) => warn!(error = %e, "Default pair is invalid"),
    }

    // ── 5. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            warn!("Shutdown signal received, stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("candle-dash shut down complete.");
    Ok(())
}
