//! Price engine.
//!
//! Owns the window store and the aggregator. Every accepted tick is
//! appended to its window and the instrument's aggregate is recomputed
//! before the call returns.

use crate::aggregator::{AggregateValue, Aggregator, DEFAULT_DISPLAY_DECIMALS};
use crate::tick::Tick;
use crate::window::{SlidingWindowStore, DEFAULT_WINDOW_CAPACITY};
use kiba_core::{Instrument, Price, Source};
use tracing::trace;

/// Engine sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub window_capacity: usize,
    pub display_decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            display_decimals: DEFAULT_DISPLAY_DECIMALS,
        }
    }
}

/// Result of recording one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Window length after the insert.
    pub window_len: usize,
    /// Unrounded aggregate after the recompute.
    pub aggregate: Option<Price>,
}

/// Explicit engine state, shared by `Arc`.
pub struct PriceEngine {
    store: SlidingWindowStore,
    aggregator: Aggregator,
}

impl PriceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: SlidingWindowStore::new(config.window_capacity),
            aggregator: Aggregator::new(config.display_decimals),
        }
    }

    pub fn record_tick(&self, tick: &Tick) -> RecordOutcome {
        self.record(tick.source, tick.instrument, tick.price)
    }

    /// Append `price` to the (source, instrument) window and recompute.
    pub fn record(&self, source: Source, instrument: Instrument, price: Price) -> RecordOutcome {
        let window_len = self.store.record_tick(source, instrument, price);
        trace!(%source, %instrument, %price, window_len, "Tick recorded");
        RecordOutcome {
            window_len,
            aggregate: self.recompute(instrument),
        }
    }

    pub fn recompute(&self, instrument: Instrument) -> Option<Price> {
        let windows = self.store.windows_for(instrument);
        self.aggregator.recompute(instrument, &windows)
    }

    pub fn aggregate(&self, instrument: Instrument) -> Option<AggregateValue> {
        self.aggregator.get(instrument)
    }

    pub fn snapshot(&self) -> Vec<(Instrument, AggregateValue)> {
        self.aggregator.snapshot()
    }

    pub fn store(&self) -> &SlidingWindowStore {
        &self.store
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}

impl Default for PriceEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
