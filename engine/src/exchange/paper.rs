//! Paper trading order client

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{OrderClient, OrderFill, OrderSide, OrderType};
use crate::error::Result;

/// Simulated order execution: every order fills instantly and completely at
/// the quoted price. This is the default client; live execution plugs in by
/// implementing [`OrderClient`] against a real exchange.
#[derive(Debug, Default)]
pub struct PaperClient;

impl PaperClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OrderClient for PaperClient {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        quantity: f64,
        price_hint: f64,
    ) -> Result<OrderFill> {
        debug!(
            "paper fill: {:?} {:?} {} {} @ {}",
            side, order_type, quantity, symbol, price_hint
        );
        Ok(OrderFill {
            price: price_hint,
            quantity,
            timestamp: Utc::now(),
        })
    }
}
