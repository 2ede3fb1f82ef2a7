//! Main application orchestration.
//!
//! Owns the price engine and the reporter, opens the tracking session and
//! drains every source connection through one channel. Each frame is parsed,
//! recorded and aggregated before the next one is read.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::session::Session;
use kiba_core::Source;
use kiba_feed::{
    parser_for, FrameParser, PriceEngine, RecordOutcome, ReportSink, Reporter, StdoutSink,
};
use kiba_telemetry::{Metrics, SessionStatsReporter};
use kiba_ws::WsEvent;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Capacity of the shared connection → application channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// How often stopped source connections are looked for.
const SOURCE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Main application.
pub struct Application {
    config: Arc<AppConfig>,
    engine: Arc<PriceEngine>,
    reporter: Reporter,
    parsers: HashMap<Source, Box<dyn FrameParser>>,
}

impl Application {
    /// Create an application reporting to stdout.
    pub fn new(config: AppConfig) -> Self {
        Self::with_sink(config, Arc::new(StdoutSink))
    }

    pub fn with_sink(config: AppConfig, sink: Arc<dyn ReportSink>) -> Self {
        let engine = Arc::new(PriceEngine::new(config.engine_config()));
        let reporter = Reporter::new(Arc::clone(&engine), sink, config.reporter_config());
        Self {
            config: Arc::new(config),
            engine,
            reporter,
            parsers: HashMap::new(),
        }
    }

    /// Shared engine handle.
    pub fn engine(&self) -> Arc<PriceEngine> {
        Arc::clone(&self.engine)
    }

    /// Track `pair` from `sources` until Ctrl-C.
    pub async fn run(self, pair: &str, sources: &[String]) -> AppResult<()> {
        self.run_until(pair, sources, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(?e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Track `pair` from `sources` until `shutdown` completes.
    pub async fn run_until<F>(mut self, pair: &str, sources: &[String], shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        let (event_tx, mut event_rx) = mpsc::channel::<WsEvent>(EVENT_CHANNEL_CAPACITY);

        let mut session = Session::open(pair, Arc::clone(&self.config), &self.reporter, event_tx)?;
        let instrument = session.instrument();

        for name in sources {
            let source = session.bind(name).source;
            self.parsers
                .entry(source)
                .or_insert_with(|| parser_for(source, instrument));
        }

        let stats = SessionStatsReporter::new(
            instrument.symbol(),
            session
                .sources()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        );

        info!(%instrument, sources = ?session.sources(), "Entering main event loop");
        tokio::pin!(shutdown);
        let mut source_check = tokio::time::interval(SOURCE_CHECK_INTERVAL);

        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    self.handle_event(event);
                }

                _ = source_check.tick() => {
                    if !session.reap_finished().is_empty() && session.sources().is_empty() {
                        error!(%instrument, "Every source stopped, no further ticks will arrive");
                    }
                }

                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.reporter.shutdown();
        session.shutdown().await;
        stats.output_summary();

        Ok(())
    }

    /// Apply one connection event.
    pub fn handle_event(&mut self, event: WsEvent) {
        match event {
            WsEvent::Connected { label } => {
                info!(source = %label, "Source connected");
                Metrics::ws_connected(&label);
            }
            WsEvent::Disconnected { label, reason } => {
                warn!(source = %label, %reason, "Source disconnected");
                Metrics::ws_disconnected(&label);
            }
            WsEvent::Text { label, text } => match self.handle_text(&label, &text) {
                Ok(_) => {}
                Err(AppError::Feed(e)) => {
                    debug!(source = %label, error = %e, "Frame dropped");
                    Metrics::tick_dropped(&label, e.reason());
                }
                Err(e) => {
                    debug!(source = %label, error = %e, "Frame dropped");
                    Metrics::tick_dropped(&label, "unknown_source");
                }
            },
        }
    }

    /// Parse a text frame and feed the resulting tick to the engine.
    ///
    /// Returns `Ok(None)` for control frames.
    pub fn handle_text(&mut self, label: &str, text: &str) -> AppResult<Option<RecordOutcome>> {
        let source: Source = label.parse()?;
        let Some(parser) = self.parsers.get_mut(&source) else {
            return Err(AppError::Config(format!("no parser bound for {source}")));
        };

        let Some(tick) = parser.parse(text)? else {
            return Ok(None);
        };

        let outcome = self.engine.record_tick(&tick);
        let instrument = tick.instrument.symbol();
        Metrics::tick_recorded(source.as_str(), &instrument, outcome.window_len);

        match self.engine.aggregate(tick.instrument) {
            Some(value) if outcome.aggregate.is_some() => {
                Metrics::aggregate_updated(&instrument, value.as_f64());
            }
            _ => Metrics::no_data(&instrument),
        }

        Ok(Some(outcome))
    }
}
