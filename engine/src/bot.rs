//! Bot state machine
//!
//! One `Bot` runs one DCA ladder on one symbol. Ticks drive it through
//! `advance`; stop/panic commands bypass tick evaluation. All mutation is
//! serialized by the engine's write lock, so transitions never race.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{EntryType, StopAction, StrategyConfig};
use crate::error::{EngineError, Result};
use crate::exchange::{OrderClient, OrderFill, OrderSide, OrderType};
use crate::ladder;

/// A confirmed buy recorded against the position. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// 0 = base order, 1..N = safety orders
    pub order_index: u32,
    /// Executed price
    pub price: f64,
    /// Executed base-currency quantity
    pub quantity: f64,
    /// Execution time
    pub timestamp: DateTime<Utc>,
}

/// Bot lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    /// Waiting for the base order to fill
    Pending,
    /// Ladder running
    Active,
    /// Take-profit reached (terminal unless continuous mode looped)
    Completed,
    /// Stopped by stop-loss or manual command
    Stopped,
    /// Unconditional market exit
    PanicSold,
}

impl BotStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BotStatus::Completed | BotStatus::Stopped | BotStatus::PanicSold
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Pending => "pending",
            BotStatus::Active => "active",
            BotStatus::Completed => "completed",
            BotStatus::Stopped => "stopped",
            BotStatus::PanicSold => "panic_sold",
        }
    }
}

/// State transition emitted by a tick or command, consumed by the registry
/// (capital settlement) and the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BotEvent {
    BotStarted {
        price: f64,
    },
    SafetyOrderFilled {
        order_index: u32,
        price: f64,
        quantity: f64,
        pnl_percent: f64,
    },
    TakeProfitHit {
        price: f64,
        pnl_percent: f64,
        pnl_amount: f64,
    },
    StopLossHit {
        price: f64,
        pnl_percent: f64,
        pnl_amount: f64,
    },
    ManualStop {
        price: f64,
        pnl_percent: f64,
        pnl_amount: f64,
    },
    PanicSold {
        price: f64,
        pnl_percent: f64,
        pnl_amount: f64,
    },
    LoopRestart {
        price: f64,
    },
}

impl BotEvent {
    /// Human-readable event name, as recorded in the trade history.
    pub fn label(&self) -> String {
        match self {
            BotEvent::BotStarted { .. } => "Bot Started".to_string(),
            BotEvent::SafetyOrderFilled { order_index, .. } => {
                format!("DCA Buy #{order_index}")
            }
            BotEvent::TakeProfitHit { .. } => "Take Profit".to_string(),
            BotEvent::StopLossHit { .. } => "Stop Loss".to_string(),
            BotEvent::ManualStop { .. } => "Manual Stop".to_string(),
            BotEvent::PanicSold { .. } => "Panic Sell".to_string(),
            BotEvent::LoopRestart { .. } => "Loop Restart".to_string(),
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            BotEvent::BotStarted { price }
            | BotEvent::SafetyOrderFilled { price, .. }
            | BotEvent::TakeProfitHit { price, .. }
            | BotEvent::StopLossHit { price, .. }
            | BotEvent::ManualStop { price, .. }
            | BotEvent::PanicSold { price, .. }
            | BotEvent::LoopRestart { price } => *price,
        }
    }

    pub fn pnl_percent(&self) -> f64 {
        match self {
            BotEvent::SafetyOrderFilled { pnl_percent, .. }
            | BotEvent::TakeProfitHit { pnl_percent, .. }
            | BotEvent::StopLossHit { pnl_percent, .. }
            | BotEvent::ManualStop { pnl_percent, .. }
            | BotEvent::PanicSold { pnl_percent, .. } => *pnl_percent,
            BotEvent::BotStarted { .. } | BotEvent::LoopRestart { .. } => 0.0,
        }
    }

    /// Realized quote-currency PnL settled by this event; zero for
    /// non-exit events.
    pub fn pnl_amount(&self) -> f64 {
        match self {
            BotEvent::TakeProfitHit { pnl_amount, .. }
            | BotEvent::StopLossHit { pnl_amount, .. }
            | BotEvent::ManualStop { pnl_amount, .. }
            | BotEvent::PanicSold { pnl_amount, .. } => *pnl_amount,
            _ => 0.0,
        }
    }

    /// Whether this event ends the current strategy run and releases the
    /// bot's capital reservation.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            BotEvent::TakeProfitHit { .. }
                | BotEvent::StopLossHit { .. }
                | BotEvent::ManualStop { .. }
                | BotEvent::PanicSold { .. }
        )
    }
}

/// One DCA strategy bound to one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    /// Bot ID
    pub id: Uuid,
    /// Market symbol, dash notation (e.g. "BTC-USDT")
    pub symbol: String,
    /// Immutable strategy parameters
    pub config: StrategyConfig,
    /// Lifecycle status
    pub status: BotStatus,
    /// Ordered fill history of the current run
    pub fills: Vec<Fill>,
    /// Last observed market price
    pub current_price: f64,
    /// Start of the current run
    pub start_time: DateTime<Utc>,
}

impl Bot {
    pub fn new(symbol: String, config: StrategyConfig, current_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            config,
            status: BotStatus::Pending,
            fills: Vec::new(),
            current_price,
            start_time: Utc::now(),
        }
    }

    /// Fill price of the base order, if it has executed.
    pub fn base_fill_price(&self) -> Option<f64> {
        self.fills.first().map(|f| f.price)
    }

    /// Number of safety orders filled in the current run (excludes the base
    /// order).
    pub fn safety_orders_filled(&self) -> u32 {
        self.fills.len().saturating_sub(1) as u32
    }

    /// Quantity-weighted average entry price, recomputed from fills.
    pub fn average_entry_price(&self) -> f64 {
        ladder::average_entry_price(&self.fills)
    }

    /// Quote-currency capital spent across all fills of the current run.
    pub fn invested(&self) -> f64 {
        ladder::invested(&self.fills)
    }

    /// Total base-currency quantity held.
    pub fn position_quantity(&self) -> f64 {
        self.fills.iter().map(|f| f.quantity).sum()
    }

    /// Unrealized PnL percent at the last observed price.
    pub fn pnl_percent(&self) -> f64 {
        ladder::unrealized_pnl_percent(
            self.average_entry_price(),
            self.current_price,
            self.config.profit_currency,
        )
    }

    /// Unrealized PnL in quote currency at the last observed price.
    pub fn unrealized_pnl(&self) -> f64 {
        self.invested() * self.pnl_percent() / 100.0
    }

    fn entry_order_type(&self) -> OrderType {
        match self.config.entry_type {
            EntryType::Market => OrderType::Market,
            EntryType::Limit => OrderType::Limit,
        }
    }

    /// Advance the state machine by one tick at the given price.
    ///
    /// Returns the events produced (at most two: a take-profit followed by a
    /// continuous-mode restart). Exchange failures leave the bot unchanged
    /// so the same trigger re-evaluates on the next tick.
    pub async fn advance(&mut self, price: f64, client: &dyn OrderClient) -> Vec<BotEvent> {
        match self.status {
            BotStatus::Pending => {
                self.current_price = price;
                self.advance_pending(price, client).await
            }
            BotStatus::Active => {
                self.current_price = price;
                self.advance_active(price, client).await
            }
            // Terminal bots are retained read-only for reporting
            _ => Vec::new(),
        }
    }

    async fn advance_pending(&mut self, price: f64, client: &dyn OrderClient) -> Vec<BotEvent> {
        let quantity = self.config.base_order_size / price;
        match client
            .place_order(
                &self.symbol,
                OrderSide::Buy,
                self.entry_order_type(),
                quantity,
                price,
            )
            .await
        {
            Ok(fill) => {
                self.record_fill(0, &fill);
                self.status = BotStatus::Active;
                info!("bot started: {} base order filled @ {}", self.symbol, fill.price);
                vec![BotEvent::BotStarted { price: fill.price }]
            }
            Err(err) => {
                warn!("base order for {} failed, retrying next tick: {err}", self.symbol);
                Vec::new()
            }
        }
    }

    async fn advance_active(&mut self, price: f64, client: &dyn OrderClient) -> Vec<BotEvent> {
        let Some(base_fill) = self.base_fill_price() else {
            return Vec::new();
        };
        let average = self.average_entry_price();
        let pnl_percent =
            ladder::unrealized_pnl_percent(average, price, self.config.profit_currency);
        let pnl_amount = self.invested() * pnl_percent / 100.0;

        // Fixed priority: stop-loss, then take-profit, then safety order.
        // First match wins for this tick.
        if self.config.stop_loss_enabled
            && price <= ladder::stop_loss_target_price(&self.config, average)
        {
            if self.config.stop_action == StopAction::Close
                && self.close_position(price, client).await.is_err()
            {
                return Vec::new();
            }
            self.status = BotStatus::Stopped;
            info!("stop loss: {} closed at {pnl_percent:.2}%", self.symbol);
            return vec![BotEvent::StopLossHit {
                price,
                pnl_percent,
                pnl_amount,
            }];
        }

        if price >= ladder::take_profit_target_price(&self.config, average, base_fill) {
            if self.close_position(price, client).await.is_err() {
                return Vec::new();
            }
            info!("take profit: {} closed at +{pnl_percent:.2}%", self.symbol);
            let hit = BotEvent::TakeProfitHit {
                price,
                pnl_percent,
                pnl_amount,
            };
            if self.config.continuous_mode {
                self.reset_for_restart();
                info!("loop restart: {} re-entering at market", self.symbol);
                return vec![hit, BotEvent::LoopRestart { price }];
            }
            self.status = BotStatus::Completed;
            return vec![hit];
        }

        let filled = self.safety_orders_filled();
        if filled < self.config.max_safety_orders {
            let trigger = ladder::next_safety_trigger_price(&self.config, base_fill, filled);
            if price <= trigger {
                let next_index = filled + 1;
                let quantity =
                    ladder::next_safety_order_quantity(&self.config, next_index, trigger);
                match client
                    .place_order(&self.symbol, OrderSide::Buy, OrderType::Market, quantity, price)
                    .await
                {
                    Ok(fill) => {
                        self.record_fill(next_index, &fill);
                        info!(
                            "safety order #{next_index} filled for {} @ {}",
                            self.symbol, fill.price
                        );
                        return vec![BotEvent::SafetyOrderFilled {
                            order_index: next_index,
                            price: fill.price,
                            quantity: fill.quantity,
                            pnl_percent,
                        }];
                    }
                    Err(err) => {
                        warn!(
                            "safety order #{next_index} for {} failed, retrying next tick: {err}",
                            self.symbol
                        );
                        return Vec::new();
                    }
                }
            }
        }

        Vec::new()
    }

    /// Manual stop. Valid from `Active` (market close) or `Pending` (cancel,
    /// nothing held yet).
    pub async fn stop(&mut self, price: f64, client: &dyn OrderClient) -> Result<BotEvent> {
        match self.status {
            BotStatus::Pending => {
                self.status = BotStatus::Stopped;
                info!("bot stopped before entry: {}", self.symbol);
                Ok(BotEvent::ManualStop {
                    price,
                    pnl_percent: 0.0,
                    pnl_amount: 0.0,
                })
            }
            BotStatus::Active => {
                let pnl_percent = ladder::unrealized_pnl_percent(
                    self.average_entry_price(),
                    price,
                    self.config.profit_currency,
                );
                let pnl_amount = self.invested() * pnl_percent / 100.0;
                self.close_position(price, client).await?;
                self.status = BotStatus::Stopped;
                info!("bot stopped: {} closed at {pnl_percent:.2}%", self.symbol);
                Ok(BotEvent::ManualStop {
                    price,
                    pnl_percent,
                    pnl_amount,
                })
            }
            _ => Err(EngineError::InvalidState {
                symbol: self.symbol.clone(),
                status: self.status.as_str(),
                action: "stopped",
            }),
        }
    }

    /// Unconditional market exit regardless of PnL. Valid from any
    /// non-terminal state.
    pub async fn panic_sell(&mut self, price: f64, client: &dyn OrderClient) -> Result<BotEvent> {
        if self.status.is_terminal() {
            return Err(EngineError::InvalidState {
                symbol: self.symbol.clone(),
                status: self.status.as_str(),
                action: "panic-sold",
            });
        }
        let pnl_percent = ladder::unrealized_pnl_percent(
            self.average_entry_price(),
            price,
            self.config.profit_currency,
        );
        let pnl_amount = self.invested() * pnl_percent / 100.0;
        self.close_position(price, client).await?;
        self.status = BotStatus::PanicSold;
        info!("panic sell: {} exited at {pnl_percent:.2}%", self.symbol);
        Ok(BotEvent::PanicSold {
            price,
            pnl_percent,
            pnl_amount,
        })
    }

    fn record_fill(&mut self, order_index: u32, fill: &OrderFill) {
        self.fills.push(Fill {
            order_index,
            price: fill.price,
            quantity: fill.quantity,
            timestamp: fill.timestamp,
        });
    }

    fn reset_for_restart(&mut self) {
        self.fills.clear();
        self.status = BotStatus::Pending;
        self.start_time = Utc::now();
    }

    async fn close_position(&self, price: f64, client: &dyn OrderClient) -> Result<()> {
        let quantity = self.position_quantity();
        if quantity <= 0.0 {
            return Ok(());
        }
        client
            .place_order(&self.symbol, OrderSide::Sell, OrderType::Market, quantity, price)
            .await?;
        Ok(())
    }
}
