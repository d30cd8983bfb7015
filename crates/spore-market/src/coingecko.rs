//! CoinGecko simple-price client.
//!
//! One batched `GET /simple/price` per call for every configured token.
//! Docs: <https://docs.coingecko.com/reference/simple-price>

use async_trait::async_trait;
use serde::Deserialize;
use spore_core::{config::MarketConfig, error::SporeError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::tokens::TokenTable;

/// Price and 24h change of one token, valid for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub symbol: String,
    pub label: String,
    /// USD price, if the provider reported one.
    pub price: Option<f64>,
    /// 24h change in percent, if the provider reported one.
    pub change_24h: Option<f64>,
}

/// Source of live prices.
///
/// Implementations never fail: transport problems yield an empty map.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Quotes for every configured token the provider knows, keyed by symbol.
    async fn fetch_prices(&self) -> HashMap<String, PriceQuote>;

    /// Quotes for the requested symbols only, in request order.
    async fn fetch_quotes(&self, symbols: &[String]) -> Vec<PriceQuote> {
        let all = self.fetch_prices().await;
        symbols
            .iter()
            .filter_map(|s| all.get(&s.to_uppercase()).cloned())
            .collect()
    }
}

/// One entry of the simple-price response.
#[derive(Debug, Deserialize)]
pub(crate) struct SimplePrice {
    pub usd: Option<f64>,
    pub usd_24h_change: Option<f64>,
}

/// CoinGecko-backed price source.
pub struct CoinGecko {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    table: Arc<TokenTable>,
}

impl CoinGecko {
    /// Create from config values.
    pub fn from_config(config: &MarketConfig, table: Arc<TokenTable>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            table,
        }
    }

    async fn request(&self) -> Result<HashMap<String, SimplePrice>, SporeError> {
        let url = format!("{}/simple/price", self.base_url.trim_end_matches('/'));
        let ids = self.table.provider_ids();
        debug!("coingecko: GET {url} ids={ids}");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SporeError::Market(format!("coingecko request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SporeError::Market(format!(
                "coingecko returned {status}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| SporeError::Market(format!("coingecko: failed to parse response: {e}")))
    }
}

#[async_trait]
impl PriceSource for CoinGecko {
    async fn fetch_prices(&self) -> HashMap<String, PriceQuote> {
        if self.table.is_empty() {
            return HashMap::new();
        }

        match self.request().await {
            Ok(data) => quotes_from_response(&self.table, &data),
            Err(e) => {
                warn!("price fetch error: {e}");
                HashMap::new()
            }
        }
    }
}

/// Map a simple-price response onto the token table.
///
/// Tokens whose provider id is absent from the response are skipped.
pub(crate) fn quotes_from_response(
    table: &TokenTable,
    data: &HashMap<String, SimplePrice>,
) -> HashMap<String, PriceQuote> {
    table
        .iter()
        .filter_map(|token| {
            let entry = data.get(&token.id)?;
            Some((
                token.symbol.clone(),
                PriceQuote {
                    symbol: token.symbol.clone(),
                    label: token.label.clone(),
                    price: entry.usd,
                    change_24h: entry.usd_24h_change,
                },
            ))
        })
        .collect()
}
