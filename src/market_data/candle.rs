use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::Timeframe;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, UNIX milliseconds.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open_time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `open_time` as a UTC timestamp. Out-of-range values clamp to the epoch.
    pub fn open_time_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.open_time)
            .single()
            .unwrap_or_default()
    }

    /// Close strictly above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Finite, non-negative volume, and `low <= min(open, close) <= max(open, close) <= high`.
    pub fn is_valid(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite();

        finite
            && self.volume >= 0.0
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Composite key that identifies a unique candle series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandleKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl CandleKey {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
        }
    }
}

impl std::fmt::Display for CandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.timeframe)
    }
}

/// Last traded price, fetched independently of the candle window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub price: f64,
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Sanitising
// ---------------------------------------------------------------------------

/// Order candles ascending by `open_time`, dropping rows that violate the
/// OHLC invariant and duplicate buckets (the later copy wins).
pub fn sanitize_candles(mut candles: Vec<Candle>) -> Vec<Candle> {
    let before = candles.len();
    candles.retain(Candle::is_valid);
    let invalid = before - candles.len();

    // Stable sort keeps arrival order among equal open_times.
    candles.sort_by_key(|c| c.open_time);

    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    let mut duplicates = 0usize;
    for candle in candles {
        match out.last_mut() {
            Some(last) if last.open_time == candle.open_time => {
                *last = candle;
                duplicates += 1;
            }
            _ => out.push(candle),
        }
    }

    if invalid > 0 || duplicates > 0 {
        warn!(invalid, duplicates, kept = out.len(), "dropped malformed candles");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
