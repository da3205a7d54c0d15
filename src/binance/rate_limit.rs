// =============================================================================
// Rate-Limit Tracker: watches Binance request weight to avoid 429s
// =============================================================================
//
// Binance allows 1200 request-weight per minute per IP. Every response carries
// `X-MBX-USED-WEIGHT-1M`; we record it and refuse to send further requests
// once it reaches our own hard cap of 1000.
// =============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 800;

/// Thread-safe weight tracker backed by an atomic counter.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
}

/// Point-in-time view for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
    pub hard_limit: u32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the weight reported in the response headers, if present.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(weight) = headers
            .get("x-mbx-used-weight-1m")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };
        self.record(weight);
    }

    fn record(&self, weight: u32) {
        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    /// `false` once the last reported weight reached the hard cap.
    pub fn can_send(&self) -> bool {
        self.used_weight_1m.load(Ordering::Relaxed) < WEIGHT_HARD_LIMIT
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_weight_1m.load(Ordering::Relaxed),
            hard_limit: WEIGHT_HARD_LIMIT,
        }
    }
}
