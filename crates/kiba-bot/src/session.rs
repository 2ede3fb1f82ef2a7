//! Tracking session.
//!
//! Validates the requested pair, arms reporting once for it and binds each
//! requested source to a live connection.

use crate::config::AppConfig;
use crate::sources::{connector_for, SourceHandle};
use kiba_core::{is_valid_exchange, parse_pair, CoreError, Instrument, Source};
use kiba_feed::Reporter;
use kiba_ws::WsEvent;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One tracked instrument and its bound sources.
pub struct Session {
    instrument: Instrument,
    config: Arc<AppConfig>,
    events: mpsc::Sender<WsEvent>,
    handles: BTreeMap<Source, SourceHandle>,
}

impl Session {
    /// Parse and validate `pair`, then arm its report timer.
    ///
    /// Nothing is armed or connected when validation fails.
    pub fn open(
        pair: &str,
        config: Arc<AppConfig>,
        reporter: &Reporter,
        events: mpsc::Sender<WsEvent>,
    ) -> Result<Self, CoreError> {
        let instrument = parse_pair(pair).map_err(|e| {
            warn!("{}", e.hint());
            e
        })?;

        if !reporter.arm(instrument) {
            debug!(%instrument, "Reporting already armed");
        }

        Ok(Self {
            instrument,
            config,
            events,
            handles: BTreeMap::new(),
        })
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    /// Start streaming from the named source.
    ///
    /// Unknown names fall back to the default source. Binding a source that
    /// is already bound returns the existing connection.
    pub fn bind(&mut self, name: &str) -> &SourceHandle {
        let upper = name.trim().to_uppercase();
        if !is_valid_exchange(&upper) {
            warn!(
                requested = %name,
                fallback = %Source::DEFAULT,
                "Unknown exchange, using default source"
            );
        }
        let source = Source::resolve(&upper);

        info!("Reading moving average of {} from {}.....", self.instrument, source);

        let instrument = self.instrument;
        let config = &self.config;
        let events = &self.events;
        self.handles.entry(source).or_insert_with(|| {
            debug!(%source, %instrument, "Binding source");
            connector_for(source, config).connect(instrument, events.clone())
        })
    }

    /// Bound sources in canonical order.
    pub fn sources(&self) -> Vec<Source> {
        self.handles.keys().copied().collect()
    }

    pub fn handle(&self, source: Source) -> Option<&SourceHandle> {
        self.handles.get(&source)
    }

    /// Drop sources whose connection task has stopped and return them.
    ///
    /// A source stops on its own only once `max_reconnect_attempts` is spent.
    pub fn reap_finished(&mut self) -> Vec<Source> {
        let finished: Vec<Source> = self
            .handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(source, _)| *source)
            .collect();
        for source in &finished {
            self.handles.remove(source);
            warn!(%source, instrument = %self.instrument, "Source stopped reconnecting");
        }
        finished
    }

    /// Close every source connection.
    pub async fn shutdown(&mut self) {
        let handles = std::mem::take(&mut self.handles);
        for (source, handle) in handles {
            debug!(%source, "Closing source");
            handle.shutdown().await;
        }
    }
}
