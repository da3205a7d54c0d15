// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and return JSON. Failures come back as
// `{ "error": <code>, "message": <text> }` with a matching status code.
//
// CORS is permissive: every route is read-only except the cache reset.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::AppState;
use crate::chart::{build_figure, Figure};
use crate::dashboard::DashboardSnapshot;
use crate::error::DashboardError;

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
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/dashboard/chart", get(dashboard_chart))
        .route("/api/v1/rates", get(rates))
        .route("/api/v1/errors", get(errors))
        .route("/api/v1/config", get(config))
        .route("/api/v1/cache", delete(clear_cache))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health())
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct DashboardQuery {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    timeframe: Option<String>,
    /// Bypass the cache.
    #[serde(default)]
    force: bool,
}

async fn load_snapshot(
    state: &AppState,
    query: &DashboardQuery,
) -> Result<DashboardSnapshot, DashboardError> {
    let key = match state.resolve_key(query.symbol.as_deref(), query.timeframe.as_deref()) {
        Ok(key) => key,
        Err(e) => {
            state.push_error(&e);
            return Err(e);
        }
    };
    state.refresh_dashboard(&key, query.force).await
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSnapshot>, DashboardError> {
    load_snapshot(&state, &query).await.map(Json)
}

async fn dashboard_chart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Figure>, DashboardError> {
    let snapshot = load_snapshot(&state, &query).await?;
    Ok(Json(build_figure(&snapshot)))
}

// =============================================================================
// Currency rates
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct RatesQuery {
    #[serde(default)]
    base: Option<String>,
    #[serde(default)]
    quote: Option<String>,
}

#[derive(Debug, Serialize)]
struct RateResponse {
    base: String,
    quote: String,
    rate: f64,
}

async fn rates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RatesQuery>,
) -> Result<Json<RateResponse>, DashboardError> {
    let (base, quote, rate) = state
        .cross_rate(query.base.as_deref(), query.quote.as_deref())
        .await?;
    Ok(Json(RateResponse { base, quote, rate }))
}

// =============================================================================
// Errors / config / cache
// =============================================================================

async fn errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.recent_errors.read().clone();
    Json(errors)
}

async fn config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

#[derive(Debug, Default, Deserialize)]
struct CacheQuery {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    timeframe: Option<String>,
}

/// With `symbol` or `timeframe` given, drop that one snapshot; otherwise
/// drop everything.
async fn clear_cache(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CacheQuery>,
) -> Result<Json<serde_json::Value>, DashboardError> {
    let cleared = if query.symbol.is_none() && query.timeframe.is_none() {
        state.clear_caches()
    } else {
        let key = state.resolve_key(query.symbol.as_deref(), query.timeframe.as_deref())?;
        state.invalidate(&key)
    };
    info!(cleared, "caches cleared");
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}
