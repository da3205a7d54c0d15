// =============================================================================
// Runtime Configuration: dashboard settings with atomic save
// =============================================================================
//
// Loaded from `dashboard_config.json` at startup, then overridden by
// `CANDLE_DASH_*` environment variables. Every field carries a serde default
// so that adding new fields never breaks loading an older config file.
// Persistence uses an atomic tmp + rename pattern.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicators::IndicatorParams;
use crate::types::Timeframe;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "EUR/USDT".to_string()
}

fn default_lookback_hours() -> u32 {
    24
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_binance_base_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_rates_base_url() -> String {
    "https://api.coingecko.com".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_rate_base() -> String {
    "usd".to_string()
}

fn default_rate_quote() -> String {
    "eur".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Market window --------------------------------------------------------

    /// Pair shown when a request names none. Slash form is accepted.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default)]
    pub timeframe: Timeframe,

    /// How far back each refresh fetches candles.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,

    /// Lifetime of a cached refresh result. Zero disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub indicators: IndicatorParams,

    // --- Upstream APIs --------------------------------------------------------

    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,

    #[serde(default = "default_rates_base_url")]
    pub rates_base_url: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // --- Currency-rate defaults -----------------------------------------------

    #[serde(default = "default_rate_base")]
    pub rate_base: String,

    #[serde(default = "default_rate_quote")]
    pub rate_quote: String,

    // --- Server ---------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            timeframe: Timeframe::default(),
            lookback_hours: default_lookback_hours(),
            cache_ttl_secs: default_cache_ttl_secs(),
            indicators: IndicatorParams::default(),
            binance_base_url: default_binance_base_url(),
            rates_base_url: default_rates_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
            rate_base: default_rate_base(),
            rate_quote: default_rate_quote(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.lookback_hours))
    }

    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            timeframe = %config.timeframe,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Load `path`, falling back to defaults.
    ///
    /// Defaults are written out only when no file exists yet. A file that
    /// fails to parse is left untouched and the defaults live in memory.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            let cfg = Self::default();
            match cfg.save(path) {
                Ok(()) => info!(path = %path.display(), "wrote default config"),
                Err(e) => warn!(error = %e, "failed to write default config"),
            }
            return cfg;
        }

        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "failed to load config, using defaults (file left as-is)");
                Self::default()
            }
        }
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "dashboard config saved (atomic)");
        Ok(())
    }

    /// Apply `CANDLE_DASH_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(symbol) = lookup("CANDLE_DASH_SYMBOL") {
            let symbol = symbol.trim();
            if !symbol.is_empty() {
                self.symbol = symbol.to_string();
            }
        }
        if let Some(tf) = lookup("CANDLE_DASH_TIMEFRAME") {
            match tf.parse() {
                Ok(tf) => self.timeframe = tf,
                Err(e) => warn!(error = %e, "ignoring CANDLE_DASH_TIMEFRAME"),
            }
        }
        if let Some(ttl) = lookup("CANDLE_DASH_CACHE_TTL_SECS") {
            match ttl.trim().parse() {
                Ok(ttl) => self.cache_ttl_secs = ttl,
                Err(e) => warn!(error = %e, value = %ttl, "ignoring CANDLE_DASH_CACHE_TTL_SECS"),
            }
        }
        if let Some(addr) = lookup("CANDLE_DASH_BIND_ADDR") {
            self.bind_addr = addr;
        }
    }
}
