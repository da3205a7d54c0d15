// =============================================================================
// Central Application State
// =============================================================================
//
// Ties the injected data sources, the refresh pipeline and the user-facing
// error log together for the HTTP handlers.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the error log; the caches lock internally.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::warn;

use crate::binance::{RateLimitSnapshot, RateLimitTracker};
use crate::dashboard::{Dashboard, DashboardSnapshot};
use crate::error::DashboardError;
use crate::market_data::{CandleKey, MarketDataSource, TtlCache};
use crate::rates::{cross_rate, ExchangeRates, RatesSource};
use crate::runtime_config::RuntimeConfig;
use crate::types::{normalize_symbol, Timeframe};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded failure shown to the user as a non-fatal message.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Machine-readable code from [`DashboardError::code`].
    pub code: &'static str,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Single cache slot for the rate table.
const RATES_CACHE_KEY: &str = "exchange_rates";

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub market_source: &'static str,
    pub rates_source: &'static str,
    pub state_version: u64,
    pub cached_snapshots: usize,
    pub uptime_secs: u64,
    pub rate_limit: Option<RateLimitSnapshot>,
    pub server_time: i64,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across handlers via `Arc<AppState>`.
pub struct AppState {
    /// Incremented on every refresh and every recorded error.
    pub state_version: AtomicU64,

    pub config: RuntimeConfig,

    pub dashboard: Dashboard,

    rates_source: Arc<dyn RatesSource>,
    rates_cache: TtlCache<String, ExchangeRates>,

    /// Present when the market source reports request weight.
    rate_limit: Option<Arc<RateLimitTracker>>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        market_source: Arc<dyn MarketDataSource>,
        rates_source: Arc<dyn RatesSource>,
        rate_limit: Option<Arc<RateLimitTracker>>,
    ) -> Result<Self, DashboardError> {
        let dashboard = Dashboard::new(
            market_source,
            config.indicators,
            config.lookback(),
            config.cache_ttl(),
        )?;
        let rates_cache = TtlCache::new(config.cache_ttl());

        Ok(Self {
            state_version: AtomicU64::new(1),
            config,
            dashboard,
            rates_source,
            rates_cache,
            rate_limit,
            recent_errors: RwLock::new(Vec::new()),
            start_time: Instant::now(),
        })
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error. The log is capped at [`MAX_RECENT_ERRORS`]; oldest
    /// entries are evicted first.
    pub fn push_error(&self, err: &DashboardError) {
        let record = ErrorRecord {
            message: err.to_string(),
            code: err.code(),
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

    fn record<T>(&self, result: Result<T, DashboardError>) -> Result<T, DashboardError> {
        if let Err(e) = &result {
            warn!(error = %e, code = e.code(), "request failed");
            self.push_error(e);
        }
        result
    }

    // ── Dashboard ───────────────────────────────────────────────────────

    /// Resolve optional request parameters against the configured defaults.
    pub fn resolve_key(
        &self,
        symbol: Option<&str>,
        timeframe: Option<&str>,
    ) -> Result<CandleKey, DashboardError> {
        let symbol = normalize_symbol(symbol.unwrap_or(&self.config.symbol))?;
        let timeframe = match timeframe {
            Some(tf) => tf.parse::<Timeframe>()?,
            None => self.config.timeframe,
        };
        Ok(CandleKey::new(symbol, timeframe))
    }

    /// Refresh through the dashboard cache, logging any failure.
    pub async fn refresh_dashboard(
        &self,
        key: &CandleKey,
        force: bool,
    ) -> Result<DashboardSnapshot, DashboardError> {
        let result = self.dashboard.refresh(key, force).await;
        if result.is_ok() {
            self.increment_version();
        }
        self.record(result)
    }

    // ── Currency rates ──────────────────────────────────────────────────

    async fn exchange_rates(&self) -> Result<ExchangeRates, DashboardError> {
        let key = RATES_CACHE_KEY.to_string();
        if let Some(hit) = self.rates_cache.get(&key, Instant::now()) {
            return Ok(hit);
        }
        let rates = self.rates_source.fetch_exchange_rates().await?;
        self.rates_cache.insert(key, rates.clone(), Instant::now());
        Ok(rates)
    }

    /// Price of one `base` in `quote`, defaulting to the configured pair.
    pub async fn cross_rate(
        &self,
        base: Option<&str>,
        quote: Option<&str>,
    ) -> Result<(String, String, f64), DashboardError> {
        let base = base.unwrap_or(&self.config.rate_base).to_lowercase();
        let quote = quote.unwrap_or(&self.config.rate_quote).to_lowercase();

        let result = match self.exchange_rates().await {
            Ok(rates) => cross_rate(&rates, &base, &quote),
            Err(e) => Err(e),
        };
        self.record(result).map(|rate| (base, quote, rate))
    }

    /// Drop the cached snapshot for one `(symbol, timeframe)`.
    pub fn invalidate(&self, key: &CandleKey) -> usize {
        let n = usize::from(self.dashboard.invalidate(key));
        self.increment_version();
        n
    }

    /// Drop every cached snapshot and rate table.
    pub fn clear_caches(&self) -> usize {
        let n = self.dashboard.clear_cache() + self.rates_cache.clear();
        self.increment_version();
        n
    }

    // ── Health ──────────────────────────────────────────────────────────

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            market_source: self.dashboard.source_name(),
            rates_source: self.rates_source.name(),
            state_version: self.current_state_version(),
            cached_snapshots: self.dashboard.cached_snapshots(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            rate_limit: self.rate_limit.as_ref().map(|t| t.snapshot()),
            server_time: Utc::now().timestamp_millis(),
        }
    }
}
