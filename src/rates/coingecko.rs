// =============================================================================
// CoinGecko Exchange Rates: BTC-denominated rate table
// =============================================================================
//
// GET /api/v3/exchange_rates returns
//   { "rates": { "usd": { "name": "US Dollar", "unit": "$", "value": 60000.0,
//                         "type": "fiat" }, ... } }
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{ExchangeRate, ExchangeRates, RatesSource};

/// Fetches the exchange-rate table from CoinGecko.
#[derive(Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoClient {
    /// Create a client against `base_url` (e.g. `https://api.coingecko.com`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client for CoinGecko")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl RatesSource for CoinGeckoClient {
    #[instrument(skip(self), name = "coingecko::fetch_exchange_rates")]
    async fn fetch_exchange_rates(&self) -> Result<ExchangeRates> {
        let url = format!("{}/api/v3/exchange_rates", self.base_url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /api/v3/exchange_rates request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse exchange_rates response body")?;

        if !status.is_success() {
            anyhow::bail!("exchange rates API returned {}: {}", status, body);
        }

        let rates = parse_rates(body)?;
        debug!(count = rates.len(), "exchange rates fetched");
        Ok(rates)
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}

/// Pull the `rates` object out of the response, lowercasing every code.
fn parse_rates(mut body: serde_json::Value) -> Result<ExchangeRates> {
    let raw = body
        .get_mut("rates")
        .map(serde_json::Value::take)
        .context("exchange rates response missing 'rates'")?;

    let parsed: ExchangeRates =
        serde_json::from_value(raw).context("malformed 'rates' object")?;

    Ok(parsed
        .into_iter()
        .map(|(code, rate): (String, ExchangeRate)| (code.to_lowercase(), rate))
        .collect())
}
