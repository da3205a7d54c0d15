use anyhow::Result;
use async_trait::async_trait;

use super::{Candle, PricePoint};
use crate::types::Timeframe;

/// Anything that can supply candles and a last-trade price for a symbol.
///
/// Constructed once in `main` and handed to the refresh pipeline as
/// `Arc<dyn MarketDataSource>`.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Candles for `symbol` at `timeframe` whose bucket starts at or after
    /// `since_ms` (UNIX milliseconds), oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
    ) -> Result<Vec<Candle>>;

    /// Most recent traded price for `symbol`.
    async fn fetch_last_price(&self, symbol: &str) -> Result<PricePoint>;

    /// Identifier shown in logs and the health endpoint.
    fn name(&self) -> &'static str;
}
