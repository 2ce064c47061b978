//! Error types for the strategy engine

use thiserror::Error;

/// Result type alias using our EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Strategy configuration rejected at creation time
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A non-terminal bot already exists for the symbol
    #[error("a bot for {0} is already active")]
    DuplicateSymbol(String),

    /// Command against a nonexistent or terminal bot
    #[error("no active bot found for {0}")]
    NotFound(String),

    /// Command not valid in the bot's current lifecycle state
    #[error("bot for {symbol} is {status} and cannot be {action}")]
    InvalidState {
        symbol: String,
        status: &'static str,
        action: &'static str,
    },

    /// Order client or price feed failure; recovered by retrying next tick
    #[error("exchange unavailable: {0}")]
    ExchangeUnavailable(String),

    /// State or history persistence failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::ExchangeUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}
