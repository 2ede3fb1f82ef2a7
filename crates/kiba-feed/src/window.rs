//! Sliding window store.
//!
//! Keeps the N most recent prices per (source, instrument), newest first.
//! Windows are created on the first tick and never removed.

use dashmap::DashMap;
use kiba_core::{Instrument, Price, Source};
use std::collections::VecDeque;

/// Default number of prices retained per window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 60;

/// Bounded, newest-first price history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceWindow {
    prices: VecDeque<Price>,
    capacity: usize,
}

impl PriceWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            prices: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert as newest and evict the oldest beyond capacity.
    pub fn push(&mut self, price: Price) {
        self.prices.push_front(price);
        while self.prices.len() > self.capacity {
            self.prices.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent price.
    pub fn latest(&self) -> Option<Price> {
        self.prices.front().copied()
    }

    /// Prices, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Price> {
        self.prices.iter()
    }

    /// Arithmetic mean of the held prices.
    pub fn mean(&self) -> Option<Price> {
        Price::mean(self.prices.iter().copied())
    }
}

/// Store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowKey {
    pub source: Source,
    pub instrument: Instrument,
}

/// Owner of every price window.
///
/// Entries are sharded by key, so concurrent writers to different
/// (source, instrument) pairs never contend and writers to the same pair
/// are serialized.
pub struct SlidingWindowStore {
    windows: DashMap<WindowKey, PriceWindow>,
    capacity: usize,
}

impl SlidingWindowStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a price to the (source, instrument) window.
    ///
    /// Returns the window length after the insert.
    pub fn record_tick(&self, source: Source, instrument: Instrument, price: Price) -> usize {
        let mut window = self
            .windows
            .entry(WindowKey { source, instrument })
            .or_insert_with(|| PriceWindow::new(self.capacity));
        window.push(price);
        window.len()
    }

    /// Snapshot of every window tracking `instrument`, ordered by source.
    pub fn windows_for(&self, instrument: Instrument) -> Vec<(Source, PriceWindow)> {
        let mut windows: Vec<(Source, PriceWindow)> = self
            .windows
            .iter()
            .filter(|entry| entry.key().instrument == instrument)
            .map(|entry| (entry.key().source, entry.value().clone()))
            .collect();
        windows.sort_by_key(|(source, _)| *source);
        windows
    }

    pub fn window_len(&self, source: Source, instrument: Instrument) -> usize {
        self.windows
            .get(&WindowKey { source, instrument })
            .map(|w| w.len())
            .unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of windows created so far.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

impl Default for SlidingWindowStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
