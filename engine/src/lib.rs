//! Vortex Engine: a dollar-cost-averaging strategy engine
//!
//! The engine runs one DCA ladder per market symbol: it places a base order,
//! adds laddered safety orders as price moves against the position, and exits
//! on take-profit or stop-loss conditions.
//!
//! # Features
//!
//! - **Position Ladder**: pure safety-order and take-profit math
//! - **Bot State Machine**: deterministic per-symbol lifecycle transitions
//! - **Bot Registry**: one live bot per symbol, capital reservation
//! - **Strategy Engine**: single-writer tick loop over all active bots
//! - **Event Log**: append-only trade history with sequence numbers
//! - **Exchange Integration**: price feed and order client traits, with
//!   OKX REST tickers and a paper execution client
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vortex_engine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> vortex_engine::Result<()> {
//!     let feed = Arc::new(OkxFeed::new("https://www.okx.com"));
//!     let client = Arc::new(PaperClient::new());
//!     let engine = Arc::new(StrategyEngine::new(EngineSettings::default(), feed, client));
//!     engine.create_bot("BTC-USDT", StrategyConfig::default()).await?;
//!     engine.run().await;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod history;
pub mod ladder;
pub mod registry;
pub mod snapshot;
pub mod storage;

// Re-export commonly used types
pub mod prelude {
    pub use crate::bot::{Bot, BotEvent, BotStatus, Fill};
    pub use crate::config::{
        EntryType, ProfitCurrency, StopAction, StrategyConfig, TakeProfitBasis,
    };
    pub use crate::engine::{EngineSettings, StrategyEngine};
    pub use crate::error::{EngineError, Result};
    pub use crate::exchange::{OkxFeed, OrderClient, PaperClient, PriceFeed, StaticFeed, Ticker};
    pub use crate::history::{EventLog, HistoryEntry};
    pub use crate::registry::BotRegistry;
    pub use crate::snapshot::{BotSnapshot, DashboardSnapshot, Financials};
}

pub use error::{EngineError, Result};
