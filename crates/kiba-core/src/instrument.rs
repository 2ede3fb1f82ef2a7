//! Trading pair identification.
//!
//! An instrument is two distinct allow-listed tickers. Its canonical
//! identifier is the concatenation of both symbols (e.g. `ETHBTC`), which is
//! also what the exchanges use to name the market.

use crate::error::{CoreError, Result};
use crate::symbol::Ticker;
use serde::{Deserialize, Serialize};
use std::fmt;

const MIN_SYMBOL_LEN: usize = 2;
const MAX_SYMBOL_LEN: usize = 4;

/// Validated trading pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub base: Ticker,
    pub quote: Ticker,
}

impl Instrument {
    /// Build an instrument, rejecting identical tickers.
    pub fn new(base: Ticker, quote: Ticker) -> Result<Self> {
        if base == quote {
            return Err(CoreError::IdenticalTickers(format!("{base}/{quote}")));
        }
        Ok(Self { base, quote })
    }

    /// Canonical identifier (`ETHBTC`).
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

/// Extract two uppercase symbols from a pair token.
///
/// Accepts `ETH/BTC` and `ETHBTC` forms. Without a separator the split that
/// yields two known tickers wins; otherwise the first symbol takes as many
/// characters as it can.
pub fn split_pair(token: &str) -> Result<(String, String)> {
    let upper = token.trim().to_uppercase();
    let malformed = || CoreError::MalformedPair(token.to_string());

    if let Some((left, right)) = upper.split_once('/') {
        if is_symbol_shaped(left) && is_symbol_shaped(right) {
            return Ok((left.to_string(), right.to_string()));
        }
        return Err(malformed());
    }

    if !upper.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(malformed());
    }

    let len = upper.len();
    let candidates: Vec<usize> = (MIN_SYMBOL_LEN..=MAX_SYMBOL_LEN)
        .rev()
        .filter(|&at| len >= at + MIN_SYMBOL_LEN && len - at <= MAX_SYMBOL_LEN)
        .collect();

    let at = candidates
        .iter()
        .copied()
        .find(|&at| {
            upper[..at].parse::<Ticker>().is_ok() && upper[at..].parse::<Ticker>().is_ok()
        })
        .or_else(|| candidates.first().copied())
        .ok_or_else(malformed)?;

    Ok((upper[..at].to_string(), upper[at..].to_string()))
}

/// Parse and validate a pair token into an [`Instrument`].
pub fn parse_pair(token: &str) -> Result<Instrument> {
    let (left, right) = split_pair(token)?;

    let (base, quote) = match (left.parse::<Ticker>(), right.parse::<Ticker>()) {
        (Ok(base), Ok(quote)) => (base, quote),
        _ => return Err(CoreError::UnknownTicker(format!("{left}/{right}"))),
    };

    Instrument::new(base, quote)
}

fn is_symbol_shaped(s: &str) -> bool {
    (MIN_SYMBOL_LEN..=MAX_SYMBOL_LEN).contains(&s.len())
        && s.chars().all(|c| c.is_ascii_alphanumeric())
}
