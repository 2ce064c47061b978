//! Price feed implementations

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::{PriceFeed, Ticker};
use crate::error::{EngineError, Result};

/// OKX spot market data over public REST.
pub struct OkxFeed {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct OkxResponse {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<OkxTicker>,
}

#[derive(Deserialize)]
struct OkxTicker {
    #[serde(rename = "instId")]
    inst_id: String,
    last: String,
    #[serde(rename = "open24h")]
    open_24h: String,
    #[serde(rename = "volCcy24h")]
    vol_ccy_24h: String,
}

impl OkxFeed {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn request_spot_tickers(&self) -> Result<Vec<OkxTicker>> {
        let url = format!("{}/api/v5/market/tickers?instType=SPOT", self.base_url);
        let response: OkxResponse = self.client.get(&url).send().await?.json().await?;
        if response.code != "0" {
            return Err(EngineError::ExchangeUnavailable(format!(
                "okx error {}: {}",
                response.code, response.msg
            )));
        }
        Ok(response.data)
    }
}

fn to_ticker(raw: &OkxTicker) -> Option<Ticker> {
    let last: f64 = raw.last.parse().ok()?;
    let open: f64 = raw.open_24h.parse().unwrap_or(0.0);
    let change_percent = if open > 0.0 {
        (last - open) / open * 100.0
    } else {
        0.0
    };
    Some(Ticker {
        last,
        change_percent,
        volume: raw.vol_ccy_24h.parse().unwrap_or(0.0),
    })
}

#[async_trait]
impl PriceFeed for OkxFeed {
    async fn fetch_tickers(&self, symbols: &[String]) -> Result<HashMap<String, Ticker>> {
        let raw = self.request_spot_tickers().await?;
        let mut result = HashMap::new();
        for ticker in &raw {
            // OKX instIds already use dash notation (BTC-USDT)
            if symbols.iter().any(|s| s == &ticker.inst_id) {
                if let Some(parsed) = to_ticker(ticker) {
                    result.insert(ticker.inst_id.clone(), parsed);
                }
            }
        }
        debug!("fetched {} of {} requested tickers", result.len(), symbols.len());
        Ok(result)
    }

    async fn fetch_all_tickers(&self) -> Result<HashMap<String, Ticker>> {
        let raw = self.request_spot_tickers().await?;
        Ok(raw
            .iter()
            .filter_map(|t| to_ticker(t).map(|parsed| (t.inst_id.clone(), parsed)))
            .collect())
    }
}

/// In-memory feed for paper mode and tests. Prices are whatever the caller
/// last set.
#[derive(Default)]
pub struct StaticFeed {
    tickers: RwLock<HashMap<String, Ticker>>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the last price for a symbol, keeping change/volume at zero.
    pub async fn set_price(&self, symbol: &str, last: f64) {
        self.set_ticker(
            symbol,
            Ticker {
                last,
                change_percent: 0.0,
                volume: 0.0,
            },
        )
        .await;
    }

    pub async fn set_ticker(&self, symbol: &str, ticker: Ticker) {
        self.tickers.write().await.insert(symbol.to_string(), ticker);
    }
}

#[async_trait]
impl PriceFeed for StaticFeed {
    async fn fetch_tickers(&self, symbols: &[String]) -> Result<HashMap<String, Ticker>> {
        let tickers = self.tickers.read().await;
        Ok(symbols
            .iter()
            .filter_map(|s| tickers.get(s).map(|t| (s.clone(), t.clone())))
            .collect())
    }

    async fn fetch_all_tickers(&self) -> Result<HashMap<String, Ticker>> {
        Ok(self.tickers.read().await.clone())
    }
}
