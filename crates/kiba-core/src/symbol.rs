//! Ticker and exchange allow-lists.
//!
//! Both sets are closed: anything outside them is rejected (tickers) or
//! mapped to the default source (exchanges).

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known ticker symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Ticker {
    Eth,
    Btc,
    Etc,
    Ltc,
    Neo,
    Eos,
    Usdt,
    Trx,
}

impl Ticker {
    pub const ALL: [Ticker; 8] = [
        Ticker::Eth,
        Ticker::Btc,
        Ticker::Etc,
        Ticker::Ltc,
        Ticker::Neo,
        Ticker::Eos,
        Ticker::Usdt,
        Ticker::Trx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ticker::Eth => "ETH",
            Ticker::Btc => "BTC",
            Ticker::Etc => "ETC",
            Ticker::Ltc => "LTC",
            Ticker::Neo => "NEO",
            Ticker::Eos => "EOS",
            Ticker::Usdt => "USDT",
            Ticker::Trx => "TRX",
        }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ticker {
    type Err = CoreError;

    /// Exact match on the uppercase symbol.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ticker::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownTicker(s.to_string()))
    }
}

/// Market-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Binance,
    Bitfinex,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Binance, Source::Bitfinex];

    /// Source used when a requested name is not recognized.
    pub const DEFAULT: Source = Source::Binance;

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Binance => "BINANCE",
            Source::Bitfinex => "BITFINEX",
        }
    }

    /// Case-insensitive lookup that falls back to [`Source::DEFAULT`].
    pub fn resolve(name: &str) -> Source {
        name.trim()
            .to_uppercase()
            .parse()
            .unwrap_or(Source::DEFAULT)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = CoreError;

    /// Exact match on the canonical uppercase name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| CoreError::UnknownExchange(s.to_string()))
    }
}

/// True iff `symbol` is in the ticker allow-list.
pub fn is_valid_ticker(symbol: &str) -> bool {
    symbol.parse::<Ticker>().is_ok()
}

/// True iff `name` is in the exchange allow-list.
pub fn is_valid_exchange(name: &str) -> bool {
    name.parse::<Source>().is_ok()
}
