// =============================================================================
// Binance REST API Client: public market data
// =============================================================================
//
// Only unsigned endpoints are used: klines and the ticker price. Every
// response feeds the shared rate-limit tracker; requests are refused locally
// once the reported weight reaches the hard cap. Failures are returned to the
// caller as-is; there is no retry.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument, warn};

use super::rate_limit::RateLimitTracker;
use crate::market_data::{Candle, MarketDataSource, PricePoint};
use crate::types::Timeframe;

/// Largest page the klines endpoint will return.
const KLINES_PAGE_LIMIT: u32 = 1000;
/// Upper bound on pages walked for a single window.
const MAX_KLINE_PAGES: usize = 10;

/// Binance public REST client.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url` (e.g. `https://api.binance.com`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client for Binance")?;

        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self {
            base_url,
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    pub fn rate_limit(&self) -> Arc<RateLimitTracker> {
        self.rate_limit.clone()
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// GET `path` and return the parsed JSON body, failing on non-2xx.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        if !self.rate_limit.can_send() {
            anyhow::bail!("Binance request weight at hard limit; refusing GET {path}");
        }

        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {path} request failed"))?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {path} response"))?;

        if !status.is_success() {
            anyhow::bail!("Binance GET {} returned {}: {}", path, status, body);
        }
        Ok(body)
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v3/klines starting at `start_time_ms`.
    ///
    /// Array indices used:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: Timeframe,
        start_time_ms: i64,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let body = self
            .get_json(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("startTime", start_time_ms.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let candles = parse_klines(&body)?;
        debug!(symbol, interval = %interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    /// GET /api/v3/ticker/price.
    #[instrument(skip(self), name = "binance::get_ticker_price")]
    pub async fn get_ticker_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .get_json("/api/v3/ticker/price", &[("symbol", symbol.to_string())])
            .await?;

        let price = parse_str_f64(&body["price"]).context("ticker response missing 'price'")?;
        debug!(symbol, price, "ticker price fetched");
        Ok(price)
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    /// Walk kline pages forward from `since_ms` until a short page arrives.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
    ) -> Result<Vec<Candle>> {
        let mut candles = Vec::new();
        let mut start = since_ms;

        for _ in 0..MAX_KLINE_PAGES {
            let page = self
                .get_klines(symbol, timeframe, start, KLINES_PAGE_LIMIT)
                .await?;
            let full = page.len() == KLINES_PAGE_LIMIT as usize;
            let Some(last) = page.last() else {
                break;
            };
            start = last.open_time + timeframe.duration_ms();
            candles.extend(page);
            if !full {
                return Ok(candles);
            }
        }

        if !candles.is_empty() {
            warn!(
                symbol,
                pages = MAX_KLINE_PAGES,
                count = candles.len(),
                "kline page cap reached; window truncated"
            );
        }
        Ok(candles)
    }

    async fn fetch_last_price(&self, symbol: &str) -> Result<PricePoint> {
        let price = self.get_ticker_price(symbol).await?;
        Ok(PricePoint {
            symbol: symbol.to_string(),
            price,
            fetched_at: Utc::now(),
        })
    }

    fn name(&self) -> &'static str {
        "binance"
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Parsing helpers
// -----------------------------------------------------------------------------

/// Parse Binance's array-of-arrays kline payload.
fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;
        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let open_time = arr[0].as_i64().context("kline openTime is not an integer")?;
        candles.push(Candle::new(
            open_time,
            parse_str_f64(&arr[1])?,
            parse_str_f64(&arr[2])?,
            parse_str_f64(&arr[3])?,
            parse_str_f64(&arr[4])?,
            parse_str_f64(&arr[5])?,
        ));
    }
    Ok(candles)
}

/// Binance sends prices as JSON strings; accept plain numbers too.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_klines_payload() {
        let body = json!([
            [1700000000000i64, "1.0850", "1.0870", "1.0840", "1.0860", "1234.5",
             1700000299999i64, "1340.0", 210, "600.1", "651.2", "0"],
            [1700000300000i64, "1.0860", "1.0865", "1.0855", "1.0858", "99.0",
             1700000599999i64, "107.5", 12, "40.0", "43.4", "0"]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1_700_000_000_000);
        assert!((candles[0].close - 1.0860).abs() < f64::EPSILON);
        assert!((candles[1].volume - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_klines_skips_short_rows() {
        let body = json!([[1i64, "1", "2"], [2i64, "1", "2", "0.5", "1.5", "3"]]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time, 2);
    }

    #[test]
    fn parse_klines_rejects_non_array() {
        assert!(parse_klines(&json!({ "code": -1121, "msg": "Invalid symbol." })).is_err());
    }

    #[test]
    fn parse_str_f64_accepts_both_forms() {
        assert_eq!(parse_str_f64(&json!("1.25")).unwrap(), 1.25);
        assert_eq!(parse_str_f64(&json!(2.5)).unwrap(), 2.5);
        assert!(parse_str_f64(&json!(null)).is_err());
        assert!(parse_str_f64(&json!("abc")).is_err());
    }

    #[test]
    fn debug_output_shows_base_url() {
        let client = BinanceClient::new("https://api.binance.com/", Duration::from_secs(1)).unwrap();
        let dbg = format!("{client:?}");
        assert!(dbg.contains("https://api.binance.com"));
        assert!(!dbg.contains("api.binance.com/\""));
    }
}
