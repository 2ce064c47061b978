//! Bot registry and paper account
//!
//! Owns the symbol -> bot mapping in creation order and the financial
//! account. At most one non-terminal bot may exist per symbol; terminal bots
//! are retained read-only for reporting until the symbol is reused.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bot::{Bot, BotEvent, BotStatus};
use crate::config::StrategyConfig;
use crate::error::{EngineError, Result};

/// Quote-currency account backing all bots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Free + reserved balance
    pub total_balance: f64,
    /// Capital reserved for full ladders of non-terminal bots
    pub reserved_capital: f64,
    /// Realized PnL across all closed runs
    pub realized_pnl: f64,
}

impl Account {
    pub fn new(total_balance: f64) -> Self {
        Self {
            total_balance,
            reserved_capital: 0.0,
            realized_pnl: 0.0,
        }
    }
}

/// Registry of all bots, in creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotRegistry {
    bots: Vec<Bot>,
    account: Account,
}

impl BotRegistry {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            bots: Vec::new(),
            account: Account::new(initial_balance),
        }
    }

    /// Atomic check-and-insert: validates the config, rejects duplicates and
    /// reserves the full potential ladder before the bot is visible.
    pub fn create(
        &mut self,
        symbol: &str,
        config: StrategyConfig,
        current_price: f64,
    ) -> Result<()> {
        config.validate()?;
        if self
            .find(symbol)
            .is_some_and(|bot| !bot.status.is_terminal())
        {
            return Err(EngineError::DuplicateSymbol(symbol.to_string()));
        }
        let reservation = config.max_ladder_cost();
        if reservation > self.account.total_balance - self.account.reserved_capital {
            return Err(EngineError::InvalidConfig(format!(
                "ladder for {symbol} needs {reservation:.2} but only {:.2} is free",
                self.account.total_balance - self.account.reserved_capital
            )));
        }

        // Reuse of a symbol purges its retained terminal bot
        self.bots
            .retain(|bot| bot.symbol != symbol || !bot.status.is_terminal());

        self.account.reserved_capital += reservation;
        self.bots
            .push(Bot::new(symbol.to_string(), config, current_price));
        info!("bot created for {symbol}, reserved {reservation:.2}");
        Ok(())
    }

    /// Most recently created bot for the symbol, live or terminal.
    pub fn find(&self, symbol: &str) -> Option<&Bot> {
        self.bots.iter().rev().find(|bot| bot.symbol == symbol)
    }

    pub fn find_mut(&mut self, symbol: &str) -> Option<&mut Bot> {
        self.bots.iter_mut().rev().find(|bot| bot.symbol == symbol)
    }

    /// All bots in creation order.
    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    /// Symbols of non-terminal bots, in creation order. This is the fixed
    /// per-tick evaluation order.
    pub fn active_symbols(&self) -> Vec<String> {
        self.bots
            .iter()
            .filter(|bot| !bot.status.is_terminal())
            .map(|bot| bot.symbol.clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.bots
            .iter()
            .filter(|bot| !bot.status.is_terminal())
            .count()
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Unrealized PnL summed over non-terminal bots at their last observed
    /// prices.
    pub fn unrealized_pnl(&self) -> f64 {
        self.bots
            .iter()
            .filter(|bot| !bot.status.is_terminal())
            .map(|bot| bot.unrealized_pnl())
            .sum()
    }

    /// Apply the financial side of a bot event: exits settle realized PnL
    /// and release the ladder reservation; a loop restart re-reserves it.
    pub fn settle(&mut self, symbol: &str, event: &BotEvent) {
        let Some(ladder_cost) = self.find(symbol).map(|bot| bot.config.max_ladder_cost()) else {
            return;
        };
        if event.is_exit() {
            let pnl = event.pnl_amount();
            self.account.total_balance += pnl;
            self.account.realized_pnl += pnl;
            self.account.reserved_capital = (self.account.reserved_capital - ladder_cost).max(0.0);
        } else if matches!(event, BotEvent::LoopRestart { .. }) {
            self.account.reserved_capital += ladder_cost;
        }
    }

    /// Drop terminal bots from the registry (explicit purge; they stay in
    /// the event log).
    pub fn purge_terminal(&mut self) {
        self.bots.retain(|bot| !bot.status.is_terminal());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::BotEvent;

    fn small_config() -> StrategyConfig {
        StrategyConfig {
            base_order_size: 20.0,
            safety_order_size: 40.0,
            max_safety_orders: 2,
            volume_scale: 1.0,
            ..StrategyConfig::default()
        }
    }

    #[test]
    fn test_create_reserves_full_ladder() {
        let mut registry = BotRegistry::new(10_000.0);
        registry.create("BTC-USDT", small_config(), 100.0).unwrap();
        // 20 + 40 + 40
        assert!((registry.account().reserved_capital - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_symbol_rejected_while_live() {
        let mut registry = BotRegistry::new(10_000.0);
        registry.create("BTC-USDT", small_config(), 100.0).unwrap();
        let err = registry.create("BTC-USDT", small_config(), 100.0).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateSymbol(_)));
    }

    #[test]
    fn test_recreate_allowed_after_terminal() {
        let mut registry = BotRegistry::new(10_000.0);
        registry.create("BTC-USDT", small_config(), 100.0).unwrap();
        registry.find_mut("BTC-USDT").unwrap().status = BotStatus::Stopped;
        registry.settle(
            "BTC-USDT",
            &BotEvent::ManualStop {
                price: 100.0,
                pnl_percent: 0.0,
                pnl_amount: 0.0,
            },
        );
        assert!((registry.account().reserved_capital).abs() < 1e-9);

        registry.create("BTC-USDT", small_config(), 100.0).unwrap();
        // The terminal bot was purged on reuse
        assert_eq!(registry.bots().len(), 1);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_invalid_config_reserves_nothing() {
        let mut registry = BotRegistry::new(10_000.0);
        let mut config = small_config();
        config.base_order_size = -5.0;
        assert!(registry.create("BTC-USDT", config, 100.0).is_err());
        assert_eq!(registry.account().reserved_capital, 0.0);
        assert!(registry.bots().is_empty());
    }

    #[test]
    fn test_create_rejected_when_ladder_exceeds_free_balance() {
        let mut registry = BotRegistry::new(50.0);
        let err = registry.create("BTC-USDT", small_config(), 100.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_settle_take_profit_books_realized_pnl() {
        let mut registry = BotRegistry::new(10_000.0);
        registry.create("BTC-USDT", small_config(), 100.0).unwrap();
        registry.settle(
            "BTC-USDT",
            &BotEvent::TakeProfitHit {
                price: 101.5,
                pnl_percent: 1.5,
                pnl_amount: 0.3,
            },
        );
        assert!((registry.account().total_balance - 10_000.3).abs() < 1e-9);
        assert!((registry.account().realized_pnl - 0.3).abs() < 1e-9);
        assert!((registry.account().reserved_capital).abs() < 1e-9);
    }

    #[test]
    fn test_loop_restart_re_reserves_ladder() {
        let mut registry = BotRegistry::new(10_000.0);
        registry.create("BTC-USDT", small_config(), 100.0).unwrap();
        registry.settle(
            "BTC-USDT",
            &BotEvent::TakeProfitHit {
                price: 101.5,
                pnl_percent: 1.5,
                pnl_amount: 0.3,
            },
        );
        registry.settle("BTC-USDT", &BotEvent::LoopRestart { price: 101.5 });
        assert!((registry.account().reserved_capital - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_active_symbols_keep_creation_order() {
        let mut registry = BotRegistry::new(10_000.0);
        registry.create("BTC-USDT", small_config(), 100.0).unwrap();
        registry.create("ETH-USDT", small_config(), 100.0).unwrap();
        registry.create("SOL-USDT", small_config(), 100.0).unwrap();
        registry.find_mut("ETH-USDT").unwrap().status = BotStatus::PanicSold;
        assert_eq!(registry.active_symbols(), vec!["BTC-USDT", "SOL-USDT"]);
    }
}
