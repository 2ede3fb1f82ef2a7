//! Prometheus metrics and structured logging for kiba.
//!
//! - Prometheus metrics for tick ingestion, windows, aggregates and connections
//! - Structured logging with tracing (JSON in production)
//! - Session statistics summary on shutdown

pub mod error;
pub mod logging;
pub mod metrics;
pub mod session_stats;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use session_stats::{SessionStatsReporter, SourceSessionStats};
