pub mod cache;
pub mod candle;
pub mod source;

// Re-export the core types for convenient access (e.g. `use crate::market_data::Candle`).
pub use cache::TtlCache;
pub use candle::{sanitize_candles, Candle, CandleKey, PricePoint};
pub use source::MarketDataSource;
