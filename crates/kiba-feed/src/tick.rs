//! Normalized price ticks.
//!
//! Sources deliver `(price, pair, source)` where the price may be a JSON
//! string, a JSON number, or missing altogether. Everything that is not a
//! strictly positive finite decimal is dropped here, before it can reach a
//! window.

use kiba_core::{parse_pair, Instrument, Price, Source};
use serde_json::Value;

/// One price observation for a (source, instrument) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub source: Source,
    pub instrument: Instrument,
    pub price: Price,
}

impl Tick {
    pub fn new(source: Source, instrument: Instrument, price: Price) -> Self {
        Self {
            source,
            instrument,
            price,
        }
    }

    /// Build a tick from the raw callback contract.
    ///
    /// Returns `None` for an absent, zero, empty or non-numeric price and for
    /// an empty or invalid pair. Unknown source names resolve to the default
    /// source.
    pub fn from_raw(price: Option<&Value>, pair: &str, source: &str) -> Option<Self> {
        if pair.trim().is_empty() {
            return None;
        }
        let price = normalize_price(price?)?;
        let instrument = parse_pair(pair).ok()?;
        Some(Self::new(Source::resolve(source), instrument, price))
    }
}

/// Convert a JSON price into a [`Price`].
pub fn normalize_price(value: &Value) -> Option<Price> {
    match value {
        Value::String(text) => Price::parse_tick(text),
        Value::Number(n) => Price::parse_tick(&n.to_string()),
        _ => None,
    }
}
