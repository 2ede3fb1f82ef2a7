//! Core domain types for the kiba moving-average tracker.
//!
//! This crate provides fundamental types used throughout the workspace:
//! - `Ticker`, `Instrument`: Validated trading pairs
//! - `Source`: Closed set of market-data providers
//! - `Price`: Precision-safe decimal price
//! - Symbol validation against the fixed allow-lists

pub mod decimal;
pub mod error;
pub mod instrument;
pub mod symbol;

pub use decimal::Price;
pub use error::{CoreError, Result, USAGE_HINT};
pub use instrument::{parse_pair, Instrument};
pub use symbol::{is_valid_exchange, is_valid_ticker, Source, Ticker};
