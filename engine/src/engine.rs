//! Strategy engine scheduler
//!
//! Exactly one `StrategyEngine` runs per deployment. All bot-state mutation
//! funnels through its registry write lock: the tick loop and the
//! create/stop/panic commands take the same lock, so there is always a
//! single logical writer. Snapshot reads clone under the read lock.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::StrategyConfig;
use crate::error::{EngineError, Result};
use crate::exchange::{OrderClient, PriceFeed, Ticker, TimeoutClient};
use crate::history::{EventLog, HistoryEntry};
use crate::registry::BotRegistry;
use crate::snapshot::{BotSnapshot, DashboardSnapshot, Financials, SymbolInfo};
use crate::storage::{self, PersistedState};

/// Symbols kept warm in the ticker cache even with no bot attached.
pub const DEFAULT_WATCHLIST: [&str; 5] = [
    "BTC-USDT",
    "ETH-USDT",
    "SOL-USDT",
    "BNB-USDT",
    "XRP-USDT",
];

/// Maximum symbols returned by the symbol listing.
const SYMBOL_LIST_LIMIT: usize = 200;

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Cadence of the evaluation loop
    pub tick_interval: Duration,
    /// Upper bound on a single order attempt
    pub order_timeout: Duration,
    /// Starting paper balance
    pub initial_balance: f64,
    /// Where engine state is persisted; `None` disables persistence
    pub state_file: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            order_timeout: Duration::from_secs(10),
            initial_balance: 10_000.0,
            state_file: None,
        }
    }
}

/// The per-deployment strategy engine: owns the registry, the event log and
/// the ticker cache, and drives every active bot once per tick in creation
/// order.
pub struct StrategyEngine {
    registry: RwLock<BotRegistry>,
    history: RwLock<EventLog>,
    tickers: RwLock<HashMap<String, Ticker>>,
    price_feed: Arc<dyn PriceFeed>,
    order_client: Arc<dyn OrderClient>,
    settings: EngineSettings,
}

/// Uppercase dash notation: "btc/usdt" -> "BTC-USDT".
fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase().replace('/', "-")
}

impl StrategyEngine {
    pub fn new(
        settings: EngineSettings,
        price_feed: Arc<dyn PriceFeed>,
        order_client: Arc<dyn OrderClient>,
    ) -> Self {
        let order_client: Arc<dyn OrderClient> =
            Arc::new(TimeoutClient::new(order_client, settings.order_timeout));
        Self {
            registry: RwLock::new(BotRegistry::new(settings.initial_balance)),
            history: RwLock::new(EventLog::new()),
            tickers: RwLock::new(HashMap::new()),
            price_feed,
            order_client,
            settings,
        }
    }

    /// Create a bot for `symbol`. Fails on invalid config, duplicate live
    /// symbol or an unknown trading pair.
    pub async fn create_bot(&self, symbol: &str, config: StrategyConfig) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        let price = self.resolve_price(&symbol).await?;
        {
            let mut registry = self.registry.write().await;
            registry.create(&symbol, config, price)?;
        }
        self.persist_best_effort().await;
        Ok(())
    }

    /// Manual stop: market-close an active bot or cancel a pending one.
    pub async fn stop_bot(&self, symbol: &str) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        let cached = self.cached_price(&symbol).await;
        let event = {
            let mut registry = self.registry.write().await;
            let bot = registry
                .find_mut(&symbol)
                .ok_or_else(|| EngineError::NotFound(symbol.clone()))?;
            let price = cached.unwrap_or(bot.current_price);
            let event = bot.stop(price, self.order_client.as_ref()).await?;
            registry.settle(&symbol, &event);
            event
        };
        self.history.write().await.append(&symbol, &event);
        self.persist_best_effort().await;
        Ok(())
    }

    /// Unconditional market exit for the live bot on `symbol`.
    pub async fn panic_sell(&self, symbol: &str) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        let cached = self.cached_price(&symbol).await;
        let event = {
            let mut registry = self.registry.write().await;
            let bot = registry
                .find_mut(&symbol)
                .filter(|bot| !bot.status.is_terminal())
                .ok_or_else(|| EngineError::NotFound(symbol.clone()))?;
            let price = cached.unwrap_or(bot.current_price);
            let event = bot.panic_sell(price, self.order_client.as_ref()).await?;
            registry.settle(&symbol, &event);
            event
        };
        self.history.write().await.append(&symbol, &event);
        self.persist_best_effort().await;
        Ok(())
    }

    /// One evaluation pass: refresh prices, then advance every active bot
    /// exactly once, in creation order.
    pub async fn tick(&self) {
        let mut watch: Vec<String> =
            DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect();
        for symbol in self.registry.read().await.active_symbols() {
            if !watch.contains(&symbol) {
                watch.push(symbol);
            }
        }

        match self.price_feed.fetch_tickers(&watch).await {
            Ok(tickers) => self.tickers.write().await.extend(tickers),
            // Stale cached prices keep the loop going until the feed recovers
            Err(err) => warn!("ticker refresh failed: {err}; keeping cached prices"),
        }

        let prices: HashMap<String, f64> = self
            .tickers
            .read()
            .await
            .iter()
            .map(|(symbol, ticker)| (symbol.clone(), ticker.last))
            .collect();

        let mut registry = self.registry.write().await;
        let mut history = self.history.write().await;
        for symbol in registry.active_symbols() {
            let Some(&price) = prices.get(&symbol) else {
                continue;
            };
            let events = match registry.find_mut(&symbol) {
                Some(bot) => bot.advance(price, self.order_client.as_ref()).await,
                None => continue,
            };
            for event in &events {
                registry.settle(&symbol, event);
                history.append(&symbol, event);
            }
        }
    }

    /// Drive `tick` forever on the configured cadence. Ticks never overlap:
    /// a delayed tick pushes the schedule back rather than bunching up.
    pub async fn run(self: Arc<Self>) {
        info!(
            "strategy engine running, tick interval {:?}",
            self.settings.tick_interval
        );
        let mut interval = tokio::time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// Persist engine state on a fixed cadence. No-op without a state file.
    pub async fn run_persistence(self: Arc<Self>, every: Duration) {
        if self.settings.state_file.is_none() {
            return;
        }
        loop {
            tokio::time::sleep(every).await;
            match self.save_state().await {
                Ok(()) => info!("engine state persisted"),
                Err(err) => error!("state persistence failed: {err}"),
            }
        }
    }

    /// Current dashboard view, derived fresh from a shallow copy.
    pub async fn dashboard(&self) -> DashboardSnapshot {
        let (bots, account, unrealized) = {
            let registry = self.registry.read().await;
            (
                registry.bots().iter().map(BotSnapshot::from).collect(),
                registry.account().clone(),
                registry.unrealized_pnl(),
            )
        };
        DashboardSnapshot {
            ticker: self.tickers.read().await.clone(),
            bots,
            financials: Financials {
                total_balance: account.total_balance,
                reserved: account.reserved_capital,
                net_pnl: account.realized_pnl + unrealized,
            },
            history: self.history.read().await.recent(20),
        }
    }

    /// Trade history, newest first.
    pub async fn full_history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.history.read().await.recent(limit)
    }

    /// Tradable USDT pairs by descending volume.
    pub async fn symbols(&self) -> Result<Vec<SymbolInfo>> {
        let tickers = self.price_feed.fetch_all_tickers().await?;
        let mut pairs: Vec<SymbolInfo> = tickers
            .into_iter()
            .filter(|(symbol, _)| symbol.ends_with("-USDT"))
            .map(|(symbol, ticker)| SymbolInfo {
                symbol,
                last: ticker.last,
                volume: ticker.volume,
            })
            .collect();
        pairs.sort_by(|a, b| b.volume.total_cmp(&a.volume));
        pairs.truncate(SYMBOL_LIST_LIMIT);
        Ok(pairs)
    }

    pub async fn active_bot_count(&self) -> usize {
        self.registry.read().await.active_count()
    }

    /// Persist registry and history to the configured state file.
    pub async fn save_state(&self) -> Result<()> {
        let Some(path) = &self.settings.state_file else {
            return Ok(());
        };
        let state = PersistedState {
            registry: self.registry.read().await.clone(),
            history: self.history.read().await.clone(),
        };
        storage::save_json(path, &state)
    }

    /// Restore registry and history from the configured state file, if any.
    pub async fn load_state(&self) -> Result<()> {
        let Some(path) = &self.settings.state_file else {
            return Ok(());
        };
        if let Some(state) = storage::load_json::<PersistedState>(path)? {
            info!(
                "engine state restored: {} bots, {} history entries",
                state.registry.bots().len(),
                state.history.len()
            );
            *self.registry.write().await = state.registry;
            *self.history.write().await = state.history;
        }
        Ok(())
    }

    async fn persist_best_effort(&self) {
        if let Err(err) = self.save_state().await {
            error!("state persistence failed: {err}");
        }
    }

    async fn cached_price(&self, symbol: &str) -> Option<f64> {
        self.tickers.read().await.get(symbol).map(|t| t.last)
    }

    async fn resolve_price(&self, symbol: &str) -> Result<f64> {
        if let Some(price) = self.cached_price(symbol).await {
            return Ok(price);
        }
        let wanted = vec![symbol.to_string()];
        let fetched = self.price_feed.fetch_tickers(&wanted).await?;
        match fetched.get(symbol) {
            Some(ticker) => {
                let price = ticker.last;
                self.tickers
                    .write()
                    .await
                    .insert(symbol.to_string(), ticker.clone());
                Ok(price)
            }
            None => Err(EngineError::InvalidConfig(format!(
                "unknown trading pair {symbol}"
            ))),
        }
    }
}
