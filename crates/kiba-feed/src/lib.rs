//! Tick ingestion and moving-average aggregation for kiba.
//!
//! Normalizes exchange frames into ticks, keeps a bounded price window per
//! (source, instrument), and averages the per-source means into one
//! instrument-level value that the reporter prints on a fixed cadence.

pub mod aggregator;
pub mod engine;
pub mod error;
pub mod parser;
pub mod reporter;
pub mod tick;
pub mod window;

pub use aggregator::{AggregateValue, Aggregator, DEFAULT_DISPLAY_DECIMALS};
pub use engine::{EngineConfig, PriceEngine, RecordOutcome};
pub use error::{FeedError, FeedResult};
pub use parser::{parser_for, BinanceParser, BitfinexParser, FrameParser};
pub use reporter::{format_report_line, ReportSink, Reporter, ReporterConfig, StdoutSink};
pub use tick::{normalize_price, Tick};
pub use window::{PriceWindow, SlidingWindowStore, WindowKey, DEFAULT_WINDOW_CAPACITY};
