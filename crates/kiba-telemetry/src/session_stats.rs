//! Session statistics summary.
//!
//! Reads the Prometheus collectors back and logs a per-source summary of
//! the running session: ticks recorded, frames dropped, window fill and the
//! latest aggregate.

use crate::metrics::{AGGREGATE_PRICE, NO_DATA_TOTAL, TICKS_DROPPED_TOTAL, TICKS_TOTAL, WINDOW_LEN};
use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use tracing::info;

/// Statistics for one source of the tracked instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSessionStats {
    pub source: String,
    pub ticks_recorded: u64,
    pub ticks_dropped: u64,
    pub window_len: i64,
}

/// Session statistics reporter.
pub struct SessionStatsReporter {
    instrument: String,
    sources: Vec<String>,
    start_time: DateTime<Utc>,
}

impl SessionStatsReporter {
    pub fn new(instrument: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            instrument: instrument.into(),
            sources,
            start_time: Utc::now(),
        }
    }

    /// Current statistics for all sources.
    pub fn get_stats(&self) -> Vec<SourceSessionStats> {
        self.sources
            .iter()
            .map(|source| SourceSessionStats {
                source: source.clone(),
                ticks_recorded: TICKS_TOTAL
                    .with_label_values(&[source.as_str(), self.instrument.as_str()])
                    .get() as u64,
                ticks_dropped: sum_counter_for_label(&TICKS_DROPPED_TOTAL, "source", source),
                window_len: WINDOW_LEN
                    .with_label_values(&[source.as_str(), self.instrument.as_str()])
                    .get(),
            })
            .collect()
    }

    /// Latest aggregate, `None` until the first successful recompute.
    pub fn aggregate(&self) -> Option<f64> {
        let value = AGGREGATE_PRICE.with_label_values(&[self.instrument.as_str()]).get();
        (value > 0.0).then_some(value)
    }

    pub fn no_data_count(&self) -> u64 {
        NO_DATA_TOTAL.with_label_values(&[self.instrument.as_str()]).get() as u64
    }

    /// Output session statistics to logs.
    pub fn output_summary(&self) {
        let duration = Utc::now() - self.start_time;
        let minutes = duration.num_minutes();
        let seconds = duration.num_seconds() % 60;

        info!("========== Session Summary ==========");
        info!(
            "Instrument: {} (since {}, {}m {}s)",
            self.instrument,
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            minutes,
            seconds
        );

        for s in self.get_stats() {
            info!(
                "  {}: recorded={}, dropped={}, window={}",
                s.source, s.ticks_recorded, s.ticks_dropped, s.window_len
            );
        }

        match self.aggregate() {
            Some(value) => info!("  Last aggregate: {:.8}", value),
            None => info!("  Last aggregate: n/a"),
        }
        info!("  No-data recomputes: {}", self.no_data_count());
        info!("=====================================");
    }
}

/// Sum a counter over every series whose `label` equals `value`.
fn sum_counter_for_label(counter: &prometheus::CounterVec, label: &str, value: &str) -> u64 {
    let mut total = 0.0;
    for mf in counter.collect() {
        for m in mf.get_metric() {
            let matches = m
                .get_label()
                .iter()
                .any(|pair| pair.get_name() == label && pair.get_value() == value);
            if matches {
                total += m.get_counter().get_value();
            }
        }
    }
    total as u64
}
