// =============================================================================
// Indicator Engine: candles in, aligned indicator series out
// =============================================================================

use serde::{Deserialize, Serialize};

use super::{ema, rsi, sma, volume};
use crate::error::DashboardError;
use crate::market_data::Candle;

fn default_sma_window() -> usize {
    50
}

fn default_ema_span() -> usize {
    50
}

fn default_rsi_window() -> usize {
    14
}

/// Window parameters for the indicator pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_sma_window")]
    pub sma_window: usize,

    #[serde(default = "default_ema_span")]
    pub ema_span: usize,

    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_window: default_sma_window(),
            ema_span: default_ema_span(),
            rsi_window: default_rsi_window(),
        }
    }
}

impl IndicatorParams {
    /// Every window must be at least one candle wide.
    pub fn validate(&self) -> Result<(), DashboardError> {
        for (name, value) in [
            ("sma_window", self.sma_window),
            ("ema_span", self.ema_span),
            ("rsi_window", self.rsi_window),
        ] {
            if value == 0 {
                return Err(DashboardError::InvalidParameter(format!(
                    "{name} must be >= 1"
                )));
            }
        }
        Ok(())
    }

    /// Fewest candles for which every series has at least one value.
    pub fn min_candles(&self) -> usize {
        self.sma_window.max(self.rsi_window + 1)
    }
}

/// Derived series, each aligned index-for-index with the input candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub buy_volume: Vec<f64>,
    pub sell_volume: Vec<f64>,
    pub sma: Vec<Option<f64>>,
    pub ema: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Most recent defined RSI value.
    pub fn latest_rsi(&self) -> Option<f64> {
        self.rsi.iter().rev().find_map(|v| *v)
    }
}

/// Stateless indicator pass parameterised by [`IndicatorParams`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Result<Self, DashboardError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> IndicatorParams {
        self.params
    }

    /// Compute all series for `candles`.
    ///
    /// Fails with [`DashboardError::InsufficientData`] when there are fewer
    /// than `max(sma_window, rsi_window + 1)` candles.
    pub fn compute(&self, candles: &[Candle]) -> Result<IndicatorSeries, DashboardError> {
        let required = self.params.min_candles();
        if candles.len() < required {
            return Err(DashboardError::InsufficientData {
                required,
                available: candles.len(),
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let (buy_volume, sell_volume) = volume::split_volume(candles);

        Ok(IndicatorSeries {
            buy_volume,
            sell_volume,
            sma: sma::calculate_sma(&closes, self.params.sma_window),
            ema: ema::calculate_ema(&closes, self.params.ema_span)
                .into_iter()
                .map(Some)
                .collect(),
            rsi: rsi::calculate_rsi(&closes, self.params.rsi_window),
        })
    }
}
