//! Error types for kiba-core.

use thiserror::Error;

/// Example invocation appended to every input error.
pub const USAGE_HINT: &str = "Try `kiba ETH/BTC [binance | bitfinex]`";

/// Core error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Malformed trading pair: {0}")]
    MalformedPair(String),

    #[error("Invalid tickers supplied: {0}")]
    UnknownTicker(String),

    #[error("Tickers must be different from each other: {0}")]
    IdenticalTickers(String),

    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}

impl CoreError {
    /// Human-readable hint shown next to the error.
    pub fn hint(&self) -> String {
        let headline = match self {
            Self::MalformedPair(_) => "Trading pair must look like ETH/BTC or ETHBTC.",
            Self::UnknownTicker(_) => "Invalid tickers supplied.",
            Self::IdenticalTickers(_) => "Tickers must be different from each other.",
            Self::UnknownExchange(_) => "Unknown exchange.",
            Self::InvalidPrice(_) => "Price must be a positive decimal.",
        };
        format!("{headline} {USAGE_HINT}")
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
