//! Precision-safe decimal price.
//!
//! Uses `rust_decimal` so that averaging exchange quotes does not pick up
//! floating-point noise before display rounding.

use crate::error::CoreError;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Convert a float quote. NaN and infinities have no decimal form.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Self)
    }

    /// Parse a tick quote, accepting plain and scientific notation.
    ///
    /// Only strictly positive prices are valid ticks.
    pub fn parse_tick(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let value = Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()?;
        let price = Self(value);
        price.is_positive().then_some(price)
    }

    /// Arithmetic mean of the given prices.
    ///
    /// `None` when empty or when the running sum leaves the `Decimal` range.
    pub fn mean<I>(prices: I) -> Option<Self>
    where
        I: IntoIterator<Item = Price>,
    {
        let mut sum = Decimal::ZERO;
        let mut count = 0usize;
        for price in prices {
            sum = sum.checked_add(price.0)?;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        sum.checked_div(Decimal::from(count)).map(Self)
    }

    /// Round half-away-from-zero to `dp` decimal places.
    #[inline]
    pub fn round_dp(&self, dp: u32) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Fixed-point rendering with exactly `dp` decimals.
    pub fn to_fixed(&self, dp: u32) -> String {
        format!("{:.*}", dp as usize, self.round_dp(dp).0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_tick(s).ok_or_else(|| CoreError::InvalidPrice(s.to_string()))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}
