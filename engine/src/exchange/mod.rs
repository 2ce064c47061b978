//! Exchange collaborators: price feed and order execution
//!
//! The engine only touches the exchange through the two traits below, so
//! live, paper and test implementations are interchangeable.

pub mod feed;
pub mod paper;

pub use feed::{OkxFeed, StaticFeed};
pub use paper::PaperClient;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy
    Buy,
    /// Sell
    Sell,
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Market order
    Market,
    /// Limit order
    Limit,
}

/// Latest ticker state for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// Last traded price
    pub last: f64,
    /// 24h change in percent
    #[serde(rename = "change")]
    pub change_percent: f64,
    /// 24h quote volume
    pub volume: f64,
}

/// A confirmed execution returned by the order client
#[derive(Debug, Clone)]
pub struct OrderFill {
    /// Executed price
    pub price: f64,
    /// Executed base-currency quantity
    pub quantity: f64,
    /// Execution time
    pub timestamp: DateTime<Utc>,
}

/// Latest-price source for the engine's tick loop.
///
/// Symbols use dash notation, e.g. `BTC-USDT`.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetch tickers for the given symbols. Missing symbols are simply
    /// absent from the result map.
    async fn fetch_tickers(&self, symbols: &[String]) -> Result<HashMap<String, Ticker>>;

    /// Fetch every tradable ticker, for symbol listings.
    async fn fetch_all_tickers(&self) -> Result<HashMap<String, Ticker>>;
}

/// Order execution against a market. May be slow or fail; the engine treats
/// any error as `ExchangeUnavailable` and retries on a later tick. A fill is
/// only recorded when this call returns `Ok`.
#[async_trait]
pub trait OrderClient: Send + Sync {
    /// Place an order for `quantity` base units around `price_hint` and
    /// return the confirmed fill.
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        quantity: f64,
        price_hint: f64,
    ) -> Result<OrderFill>;
}

/// Wraps an order client with a per-attempt timeout so a hung exchange call
/// cannot stall the tick loop indefinitely.
pub struct TimeoutClient {
    inner: Arc<dyn OrderClient>,
    timeout: Duration,
}

impl TimeoutClient {
    pub fn new(inner: Arc<dyn OrderClient>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl OrderClient for TimeoutClient {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        quantity: f64,
        price_hint: f64,
    ) -> Result<OrderFill> {
        match tokio::time::timeout(
            self.timeout,
            self.inner
                .place_order(symbol, side, order_type, quantity, price_hint),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(EngineError::ExchangeUnavailable(format!(
                "order for {symbol} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}
