// =============================================================================
// Dashboard: fetch, validate, compute, cache
// =============================================================================
//
// One refresh is strictly sequential:
//   1. Serve from the TTL cache when the entry for (symbol, timeframe) is
//      still fresh and the caller did not force a refetch.
//   2. Fetch candles since `now - lookback`, then the last traded price.
//      Either failure aborts the refresh; nothing is cached.
//   3. Sanitise candles, find extrema, run the indicator engine. Too few
//      candles suppresses the indicator block rather than failing.
//   4. Cache and return the snapshot.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::DashboardError;
use crate::indicators::{find_extrema, Extrema, IndicatorEngine, IndicatorParams, IndicatorSeries};
use crate::market_data::{sanitize_candles, Candle, CandleKey, MarketDataSource, PricePoint, TtlCache};

/// Everything the chart needs for one `(symbol, timeframe)` window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub symbol: String,
    pub timeframe: crate::types::Timeframe,
    pub candles: Vec<Candle>,
    /// `None` when the window was too short for the configured indicators.
    pub indicators: Option<IndicatorSeries>,
    /// User-facing explanation when indicators are suppressed.
    pub notice: Option<String>,
    pub extrema: Option<Extrema>,
    pub last_price: PricePoint,
    pub params: IndicatorParams,
    pub fetched_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    /// Latest RSI reading with its zone label.
    pub fn rsi_reading(&self) -> Option<(f64, &'static str)> {
        let value = self.indicators.as_ref()?.latest_rsi()?;
        Some((value, crate::indicators::rsi::rsi_label(value)))
    }
}

/// Refresh pipeline over an injected market data source.
pub struct Dashboard {
    source: Arc<dyn MarketDataSource>,
    engine: IndicatorEngine,
    cache: TtlCache<CandleKey, DashboardSnapshot>,
    lookback: chrono::Duration,
}

impl Dashboard {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        params: IndicatorParams,
        lookback: chrono::Duration,
        cache_ttl: Duration,
    ) -> Result<Self, DashboardError> {
        Ok(Self {
            source,
            engine: IndicatorEngine::new(params)?,
            cache: TtlCache::new(cache_ttl),
            lookback,
        })
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Drop all cached snapshots, returning how many were removed.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Drop the cached snapshot for `key`, if any.
    pub fn invalidate(&self, key: &CandleKey) -> bool {
        self.cache.invalidate(key)
    }

    pub fn cached_snapshots(&self) -> usize {
        self.cache.len()
    }

    /// Return a fresh or cached snapshot for `key`.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn refresh(
        &self,
        key: &CandleKey,
        force: bool,
    ) -> Result<DashboardSnapshot, DashboardError> {
        if !force {
            if let Some(hit) = self.cache.get(key, Instant::now()) {
                debug!("serving cached snapshot");
                return Ok(hit);
            }
        }

        let snapshot = self.build_snapshot(key).await?;
        self.cache.insert(key.clone(), snapshot.clone(), Instant::now());
        Ok(snapshot)
    }

    async fn build_snapshot(&self, key: &CandleKey) -> Result<DashboardSnapshot, DashboardError> {
        let now = Utc::now();
        let since_ms = (now - self.lookback).timestamp_millis();

        let raw = self
            .source
            .fetch_candles(&key.symbol, key.timeframe, since_ms)
            .await?;
        let last_price = self.source.fetch_last_price(&key.symbol).await?;

        let candles = sanitize_candles(raw);
        let extrema = find_extrema(&candles);

        let (indicators, notice) = match self.engine.compute(&candles) {
            Ok(series) => (Some(series), None),
            Err(e @ DashboardError::InsufficientData { .. }) => {
                warn!(error = %e, "indicator traces suppressed");
                (None, Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        info!(
            source = self.source.name(),
            candles = candles.len(),
            last_price = last_price.price,
            indicators = indicators.is_some(),
            "dashboard refreshed"
        );

        Ok(DashboardSnapshot {
            symbol: key.symbol.clone(),
            timeframe: key.timeframe,
            candles,
            indicators,
            notice,
            extrema,
            last_price,
            params: self.engine.params(),
            fetched_at: now,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Timeframe;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory market data source with call counting and failure injection.
    pub(crate) struct FakeSource {
        pub candles: Vec<Candle>,
        pub price: f64,
        pub fail: AtomicBool,
        pub fail_price: AtomicBool,
        pub candle_calls: AtomicUsize,
        pub since_seen: parking_lot::Mutex<Option<i64>>,
    }

    impl FakeSource {
        pub(crate) fn with_closes(closes: &[f64]) -> Self {
            let candles = closes
                .iter()
                .enumerate()
                .map(|(i, &close)| {
                    let open = if i == 0 { close } else { closes[i - 1] };
                    Candle::new(
                        1_700_000_000_000 + i as i64 * 300_000,
                        open,
                        open.max(close) + 0.001,
                        open.min(close) - 0.001,
                        close,
                        100.0 + i as f64,
                    )
                })
                .collect();
            Self {
                candles,
                price: closes.last().copied().unwrap_or(0.0),
                fail: AtomicBool::new(false),
                fail_price: AtomicBool::new(false),
                candle_calls: AtomicUsize::new(0),
                since_seen: parking_lot::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl MarketDataSource for FakeSource {
        async fn fetch_candles(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            since_ms: i64,
        ) -> Result<Vec<Candle>> {
            self.candle_calls.fetch_add(1, Ordering::SeqCst);
            *self.since_seen.lock() = Some(since_ms);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("exchange unavailable");
            }
            Ok(self.candles.clone())
        }

        async fn fetch_last_price(&self, symbol: &str) -> Result<PricePoint> {
            if self.fail_price.load(Ordering::SeqCst) {
                anyhow::bail!("ticker unavailable");
            }
            Ok(PricePoint {
                symbol: symbol.to_string(),
                price: self.price,
                fetched_at: Utc::now(),
            })
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    pub(crate) fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1.08 + (i as f64 * 0.25).sin() * 0.01).collect()
    }

    fn dashboard(source: Arc<FakeSource>, ttl: Duration) -> Dashboard {
        Dashboard::new(
            source,
            IndicatorParams::default(),
            chrono::Duration::hours(24),
            ttl,
        )
        .unwrap()
    }

    fn key() -> CandleKey {
        CandleKey::new("EURUSDT", Timeframe::FiveMinutes)
    }

    #[tokio::test]
    async fn full_window_produces_indicators() {
        let source = Arc::new(FakeSource::with_closes(&wave(288)));
        let dash = dashboard(source.clone(), Duration::from_secs(300));

        let snap = dash.refresh(&key(), false).await.unwrap();
        assert_eq!(snap.candles.len(), 288);
        let series = snap.indicators.as_ref().expect("indicators present");
        assert_eq!(series.buy_volume.len(), 288);
        assert!(snap.notice.is_none());
        assert!(snap.extrema.is_some());
        assert!(snap.rsi_reading().is_some());
        assert_eq!(snap.last_price.symbol, "EURUSDT");
    }

    #[tokio::test]
    async fn since_is_lookback_before_now() {
        let source = Arc::new(FakeSource::with_closes(&wave(60)));
        let dash = dashboard(source.clone(), Duration::from_secs(300));

        let before = Utc::now().timestamp_millis();
        dash.refresh(&key(), false).await.unwrap();
        let since = (*source.since_seen.lock()).expect("since recorded");
        let day_ms = 24 * 3_600_000;
        assert!(since >= before - day_ms - 1_000 && since <= before - day_ms + 60_000);
    }

    #[tokio::test]
    async fn short_window_suppresses_indicators() {
        let source = Arc::new(FakeSource::with_closes(&wave(20)));
        let dash = dashboard(source, Duration::from_secs(300));

        let snap = dash.refresh(&key(), false).await.unwrap();
        assert!(snap.indicators.is_none());
        let notice = snap.notice.expect("notice explains suppression");
        assert!(notice.contains("insufficient data"));
        assert_eq!(snap.candles.len(), 20);
        assert!(snap.extrema.is_some());
    }

    #[tokio::test]
    async fn second_refresh_within_ttl_hits_cache() {
        let source = Arc::new(FakeSource::with_closes(&wave(60)));
        let dash = dashboard(source.clone(), Duration::from_secs(300));

        let a = dash.refresh(&key(), false).await.unwrap();
        let b = dash.refresh(&key(), false).await.unwrap();
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn force_and_zero_ttl_refetch() {
        let source = Arc::new(FakeSource::with_closes(&wave(60)));
        let dash = dashboard(source.clone(), Duration::from_secs(300));
        dash.refresh(&key(), false).await.unwrap();
        dash.refresh(&key(), true).await.unwrap();
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 2);

        let source = Arc::new(FakeSource::with_closes(&wave(60)));
        let dash = dashboard(source.clone(), Duration::ZERO);
        dash.refresh(&key(), false).await.unwrap();
        dash.refresh(&key(), false).await.unwrap();
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_and_is_not_cached() {
        let source = Arc::new(FakeSource::with_closes(&wave(60)));
        source.fail.store(true, Ordering::SeqCst);
        let dash = dashboard(source.clone(), Duration::from_secs(300));

        let err = dash.refresh(&key(), false).await.unwrap_err();
        assert!(matches!(err, DashboardError::Fetch(ref m) if m.contains("exchange unavailable")));

        source.fail.store(false, Ordering::SeqCst);
        assert!(dash.refresh(&key(), false).await.is_ok());
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn price_failure_aborts_and_is_not_cached() {
        let source = Arc::new(FakeSource::with_closes(&wave(60)));
        source.fail_price.store(true, Ordering::SeqCst);
        let dash = dashboard(source.clone(), Duration::from_secs(300));

        let err = dash.refresh(&key(), false).await.unwrap_err();
        assert!(matches!(err, DashboardError::Fetch(ref m) if m.contains("ticker unavailable")));
        assert_eq!(dash.cached_snapshots(), 0);

        source.fail_price.store(false, Ordering::SeqCst);
        let snap = dash.refresh(&key(), false).await.unwrap();
        assert_eq!(snap.candles.len(), 60);
        assert_eq!(dash.cached_snapshots(), 1);
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let source = Arc::new(FakeSource::with_closes(&wave(60)));
        let dash = dashboard(source.clone(), Duration::from_secs(300));
        dash.refresh(&key(), false).await.unwrap();
        assert_eq!(dash.cached_snapshots(), 1);
        assert!(dash.invalidate(&key()));
        assert!(!dash.invalidate(&key()));
        dash.refresh(&key(), false).await.unwrap();
        assert_eq!(dash.clear_cache(), 1);
        dash.refresh(&key(), false).await.unwrap();
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn keys_are_cached_independently() {
        let source = Arc::new(FakeSource::with_closes(&wave(60)));
        let dash = dashboard(source.clone(), Duration::from_secs(300));
        dash.refresh(&key(), false).await.unwrap();
        dash.refresh(&CandleKey::new("EURUSDT", Timeframe::OneHour), false)
            .await
            .unwrap();
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 2);
    }
}
