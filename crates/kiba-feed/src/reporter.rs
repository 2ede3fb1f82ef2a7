//! Periodic aggregate reporting.
//!
//! One timer task per instrument reads the current aggregate and writes a
//! report line to the sink. Timers are independent of tick arrival and
//! never write to the engine.

use crate::engine::PriceEngine;
use chrono::Local;
use kiba_core::{Instrument, Price};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Destination of report lines.
pub trait ReportSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Prints each report surrounded by blank lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&self, line: &str) {
        println!("\n{line}\n");
    }
}

/// Reporter cadence and formatting.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub interval: Duration,
    /// chrono strftime pattern for the local-time prefix.
    pub timestamp_format: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timestamp_format: "%H:%M:%S".to_string(),
        }
    }
}

/// `"<ts>  -  <INSTRUMENT> 1m avg is: <price>"`
pub fn format_report_line(timestamp: &str, instrument: Instrument, price: Price, dp: u32) -> String {
    format!("{timestamp}  -  {instrument} 1m avg is: {}", price.to_fixed(dp))
}

fn local_timestamp(format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", Local::now().format(format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", Local::now().format("%H:%M:%S"));
    }
    out
}

struct ReportTask {
    engine: Arc<PriceEngine>,
    sink: Arc<dyn ReportSink>,
    timestamp_format: String,
}

impl ReportTask {
    fn report(&self, instrument: Instrument) -> Option<String> {
        let value = self.engine.aggregate(instrument)?;
        let dp = self.engine.aggregator().display_decimals();
        let line = format_report_line(
            &local_timestamp(&self.timestamp_format),
            instrument,
            value.price,
            dp,
        );
        self.sink.emit(&line);
        Some(line)
    }
}

/// Owner of the per-instrument report timers.
pub struct Reporter {
    task: Arc<ReportTask>,
    interval: Duration,
    armed: Mutex<HashMap<Instrument, JoinHandle<()>>>,
}

impl Reporter {
    pub fn new(engine: Arc<PriceEngine>, sink: Arc<dyn ReportSink>, config: ReporterConfig) -> Self {
        Self {
            task: Arc::new(ReportTask {
                engine,
                sink,
                timestamp_format: config.timestamp_format,
            }),
            interval: config.interval.max(Duration::from_millis(1)),
            armed: Mutex::new(HashMap::new()),
        }
    }

    /// Start the report timer for `instrument`.
    ///
    /// Returns `false` when a timer already exists. Must be called from
    /// within a Tokio runtime.
    pub fn arm(&self, instrument: Instrument) -> bool {
        let mut armed = self.armed.lock();
        if armed.contains_key(&instrument) {
            debug!(%instrument, "Reporter already armed");
            return false;
        }

        let task = Arc::clone(&self.task);
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if task.report(instrument).is_none() {
                    debug!(%instrument, "No aggregate yet");
                }
            }
        });

        info!(%instrument, interval_ms = period.as_millis() as u64, "Reporter armed");
        armed.insert(instrument, handle);
        true
    }

    /// Emit one report immediately. `None` if no aggregate is known.
    pub fn report_once(&self, instrument: Instrument) -> Option<String> {
        self.task.report(instrument)
    }

    pub fn is_armed(&self, instrument: Instrument) -> bool {
        self.armed.lock().contains_key(&instrument)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.lock().len()
    }

    /// Abort every report timer.
    pub fn shutdown(&self) {
        let mut armed = self.armed.lock();
        for (instrument, handle) in armed.drain() {
            handle.abort();
            debug!(%instrument, "Reporter stopped");
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        for (_, handle) in self.armed.get_mut().drain() {
            handle.abort();
        }
    }
}
