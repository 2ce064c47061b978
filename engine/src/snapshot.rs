//! Read-only reporting views
//!
//! Snapshots are derived fresh on every read request from a shallow copy of
//! the live state; nothing here is persisted independently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bot::{Bot, BotStatus};
use crate::exchange::Ticker;
use crate::history::HistoryEntry;

/// Derived per-bot view for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSnapshot {
    pub id: Uuid,
    pub symbol: String,
    pub status: BotStatus,
    pub current_price: f64,
    pub average_entry_price: f64,
    /// Quote-currency capital currently invested
    pub invested: f64,
    /// Unrealized PnL percent at the current price
    pub pnl_percent: f64,
    pub safety_orders_filled: u32,
    pub max_safety_orders: u32,
    pub start_time: DateTime<Utc>,
}

impl From<&Bot> for BotSnapshot {
    fn from(bot: &Bot) -> Self {
        Self {
            id: bot.id,
            symbol: bot.symbol.clone(),
            status: bot.status,
            current_price: bot.current_price,
            average_entry_price: bot.average_entry_price(),
            invested: bot.invested(),
            pnl_percent: bot.pnl_percent(),
            safety_orders_filled: bot.safety_orders_filled(),
            max_safety_orders: bot.config.max_safety_orders,
            start_time: bot.start_time,
        }
    }
}

/// Financial totals across the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Financials {
    pub total_balance: f64,
    /// Capital reserved for full ladders of non-terminal bots
    pub reserved: f64,
    /// Realized plus unrealized PnL
    pub net_pnl: f64,
}

/// Everything the dashboard needs in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub ticker: HashMap<String, Ticker>,
    pub bots: Vec<BotSnapshot>,
    pub financials: Financials,
    /// Most recent history entries, newest first
    pub history: Vec<HistoryEntry>,
}

/// One tradable symbol, for the symbol picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub last: f64,
    pub volume: f64,
}
