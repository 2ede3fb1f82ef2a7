//! Prometheus metrics for kiba.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a programming error caught on first use at startup.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_int_gauge_vec, CounterVec, GaugeVec,
    IntGaugeVec,
};

/// Ticks accepted into a window.
pub static TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kiba_ticks_total",
        "Total ticks recorded into a price window",
        &["source", "instrument"]
    )
    .unwrap()
});

/// Frames dropped before reaching the engine.
/// Labels: reason (malformed/parse_error/unknown_source)
pub static TICKS_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kiba_ticks_dropped_total",
        "Total inbound frames dropped at the ingestion boundary",
        &["source", "reason"]
    )
    .unwrap()
});

/// Current rounded aggregate per instrument.
pub static AGGREGATE_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "kiba_aggregate_price",
        "Current cross-source moving average",
        &["instrument"]
    )
    .unwrap()
});

/// Samples currently held per window.
pub static WINDOW_LEN: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "kiba_window_len",
        "Number of prices held in the sliding window",
        &["source", "instrument"]
    )
    .unwrap()
});

/// Recomputes that found no contributing data.
pub static NO_DATA_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kiba_no_data_total",
        "Total aggregate recomputes with no contributing window",
        &["instrument"]
    )
    .unwrap()
});

/// WebSocket connection state per source (1 = connected).
pub static WS_CONNECTED: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "kiba_ws_connected",
        "WebSocket connection state (1=connected)",
        &["source"]
    )
    .unwrap()
});

/// WebSocket disconnects that lead to a reconnect attempt.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kiba_ws_reconnect_total",
        "Total WebSocket reconnection attempts",
        &["source"]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record a tick that reached a window.
    pub fn tick_recorded(source: &str, instrument: &str, window_len: usize) {
        TICKS_TOTAL.with_label_values(&[source, instrument]).inc();
        WINDOW_LEN
            .with_label_values(&[source, instrument])
            .set(window_len as i64);
    }

    /// Record a dropped frame.
    pub fn tick_dropped(source: &str, reason: &str) {
        TICKS_DROPPED_TOTAL
            .with_label_values(&[source, reason])
            .inc();
    }

    /// Set the current aggregate.
    pub fn aggregate_updated(instrument: &str, value: f64) {
        AGGREGATE_PRICE.with_label_values(&[instrument]).set(value);
    }

    /// Record a recompute without data.
    pub fn no_data(instrument: &str) {
        NO_DATA_TOTAL.with_label_values(&[instrument]).inc();
    }

    /// Record WebSocket connected.
    pub fn ws_connected(source: &str) {
        WS_CONNECTED.with_label_values(&[source]).set(1.0);
    }

    /// Record WebSocket disconnected (a reconnect attempt follows).
    pub fn ws_disconnected(source: &str) {
        WS_CONNECTED.with_label_values(&[source]).set(0.0);
        WS_RECONNECT_TOTAL.with_label_values(&[source]).inc();
    }
}
