// =============================================================================
// Currency Rates Module
// =============================================================================
//
// A table of exchange rates quoted against a common unit (BTC on CoinGecko).
// Any pair is derived as a cross rate:
//
//   rate(base -> quote) = rates[quote].value / rates[base].value
//
// Codes are stored lowercase; lookups are case-insensitive.

pub mod coingecko;

pub use coingecko::CoinGeckoClient;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// One row of the exchange-rate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub value: f64,
    /// `"fiat"`, `"crypto"` or `"commodity"`.
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Currency code (lowercase) to rate.
pub type ExchangeRates = BTreeMap<String, ExchangeRate>;

/// Anything that can supply the exchange-rate table.
#[async_trait]
pub trait RatesSource: Send + Sync {
    async fn fetch_exchange_rates(&self) -> Result<ExchangeRates>;

    fn name(&self) -> &'static str;
}

/// Price of one unit of `base` expressed in `quote`.
pub fn cross_rate(rates: &ExchangeRates, base: &str, quote: &str) -> Result<f64, DashboardError> {
    let lookup = |code: &str| {
        rates
            .get(&code.trim().to_lowercase())
            .ok_or_else(|| DashboardError::UnknownCurrency(code.to_string()))
    };

    let base_rate = lookup(base)?;
    let quote_rate = lookup(quote)?;

    if base_rate.value == 0.0 {
        return Err(DashboardError::DivisionByZero(format!(
            "rate for '{base}' is zero"
        )));
    }
    Ok(quote_rate.value / base_rate.value)
}
