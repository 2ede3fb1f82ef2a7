//! kiba: cross-exchange moving-average price tracker.
//!
//! Ties the workspace together:
//! - Pair validation and source binding (session)
//! - One WebSocket connection per source
//! - Tick parsing, sliding windows and average-of-averages aggregation
//! - Periodic console reports and a session summary on shutdown

pub mod app;
pub mod config;
pub mod error;
pub mod session;
pub mod sources;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::Session;
pub use sources::{connector_for, SourceConnector, SourceHandle};

/// Printed when the pair or the sources are missing.
pub const INVALID_COMMAND: &str =
    "Invalid Command - Add the symbol and exchange you want to track `kiba ETH/BTC [binance | bitfinex]`";
