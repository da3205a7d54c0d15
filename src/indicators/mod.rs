// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators drawn on the
// dashboard. Series functions return vectors aligned index-for-index with
// their input, using `None` where the window has not filled yet.

pub mod ema;
pub mod engine;
pub mod extrema;
pub mod rsi;
pub mod sma;
pub mod volume;

pub use engine::{IndicatorEngine, IndicatorParams, IndicatorSeries};
pub use extrema::{find_extrema, Extrema};
