//! Cross-source moving-average aggregation.
//!
//! The aggregate for an instrument is the unweighted mean of the per-source
//! window means. A source with a handful of ticks counts as much as a
//! source with a full window; samples are never pooled.

use crate::window::PriceWindow;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kiba_core::{Instrument, Price, Source};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, warn};

/// Decimal places kept in the stored aggregate.
pub const DEFAULT_DISPLAY_DECIMALS: u32 = 8;

/// Current smoothed price of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateValue {
    /// Average of averages, rounded for display.
    pub price: Price,
    /// Windows that contributed.
    pub sources: usize,
    /// Prices held across contributing windows.
    pub samples: usize,
    pub updated_at: DateTime<Utc>,
}

impl AggregateValue {
    pub fn as_f64(&self) -> f64 {
        self.price.inner().to_f64().unwrap_or(0.0)
    }
}

/// Unweighted mean of the per-window means.
///
/// Empty windows are skipped, as are windows whose sum leaves the decimal
/// range. Returns the mean together with the number of contributing windows
/// and their total sample count.
pub fn average_of_averages<'a, I>(windows: I) -> Option<(Price, usize, usize)>
where
    I: IntoIterator<Item = &'a PriceWindow>,
{
    let mut means = Vec::new();
    let mut samples = 0;
    for window in windows {
        if window.is_empty() {
            continue;
        }
        match window.mean() {
            Some(mean) => {
                samples += window.len();
                means.push(mean);
            }
            None => warn!(len = window.len(), "Window mean overflowed, window skipped"),
        }
    }
    let sources = means.len();
    match Price::mean(means) {
        Some(price) => Some((price, sources, samples)),
        None if sources > 0 => {
            warn!(sources, "Average of averages overflowed");
            None
        }
        None => None,
    }
}

/// Owner and only writer of the instrument → aggregate map.
pub struct Aggregator {
    values: DashMap<Instrument, AggregateValue>,
    display_decimals: u32,
}

impl Aggregator {
    pub fn new(display_decimals: u32) -> Self {
        Self {
            values: DashMap::new(),
            display_decimals,
        }
    }

    /// Recompute the aggregate for `instrument` from its source windows.
    ///
    /// Stores the rounded value and returns the unrounded one. With no data
    /// the previous value is kept and `None` is returned.
    pub fn recompute(
        &self,
        instrument: Instrument,
        windows: &[(Source, PriceWindow)],
    ) -> Option<Price> {
        let Some((price, sources, samples)) =
            average_of_averages(windows.iter().map(|(_, w)| w))
        else {
            warn!("No data provided to moving average tracker for {instrument}");
            return None;
        };

        let stored = price.round_dp(self.display_decimals);
        debug!(%instrument, %stored, sources, samples, "Aggregate updated");
        self.values.insert(
            instrument,
            AggregateValue {
                price: stored,
                sources,
                samples,
                updated_at: Utc::now(),
            },
        );
        Some(price)
    }

    pub fn get(&self, instrument: Instrument) -> Option<AggregateValue> {
        self.values.get(&instrument).map(|v| v.clone())
    }

    /// All known aggregates, ordered by instrument.
    pub fn snapshot(&self) -> Vec<(Instrument, AggregateValue)> {
        let mut all: Vec<(Instrument, AggregateValue)> = self
            .values
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        all.sort_by_key(|(instrument, _)| *instrument);
        all
    }

    pub fn display_decimals(&self) -> u32 {
        self.display_decimals
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_DECIMALS)
    }
}
