//! Exchange connection routines.
//!
//! Each source knows its stream endpoint and subscription frames. Opening a
//! source spawns a managed WebSocket connection whose events, labelled with
//! the source name, go to the shared application channel.

use crate::config::{AppConfig, WsConfig};
use kiba_core::{Instrument, Source};
use kiba_ws::{ConnectionConfig, ConnectionManager, WsEvent};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Live connection for one (source, instrument).
pub struct SourceHandle {
    pub source: Source,
    pub instrument: Instrument,
    manager: Arc<ConnectionManager>,
    listener: JoinHandle<()>,
}

impl SourceHandle {
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// The connection task has exited, either on shutdown or after running
    /// out of reconnect attempts.
    pub fn is_finished(&self) -> bool {
        self.listener.is_finished()
    }

    /// Request a graceful close and wait for the listener to exit.
    pub async fn shutdown(self) {
        self.manager.shutdown();
        if let Err(e) = self.listener.await {
            if !e.is_cancelled() {
                error!(source = %self.source, ?e, "Listener task failed");
            }
        }
    }
}

/// Connection routine of one exchange.
pub trait SourceConnector: Send + Sync {
    fn source(&self) -> Source;

    /// WebSocket URL for `instrument`.
    fn endpoint(&self, instrument: Instrument) -> String;

    /// Frames sent after each (re)connect.
    fn subscribe_frames(&self, instrument: Instrument) -> Vec<String>;

    /// Reconnect policy for this source.
    fn ws_config(&self) -> &WsConfig;

    /// Spawn the connection task.
    fn connect(&self, instrument: Instrument, events: mpsc::Sender<WsEvent>) -> SourceHandle {
        let source = self.source();
        let config = ConnectionConfig {
            label: source.as_str().to_string(),
            url: self.endpoint(instrument),
            subscribe_messages: self.subscribe_frames(instrument),
            ..self.ws_config().clone().into()
        };
        info!(%source, %instrument, url = %config.url, "Opening source connection");

        let manager = Arc::new(ConnectionManager::new(config, events));
        let task_manager = Arc::clone(&manager);
        let listener = tokio::spawn(async move {
            if let Err(e) = task_manager.connect().await {
                error!(%source, ?e, "Source connection failed");
            }
        });

        SourceHandle {
            source,
            instrument,
            manager,
            listener,
        }
    }
}

/// Binance raw stream `<symbol>@miniTicker`.
pub struct BinanceConnector {
    base_url: String,
    ws: WsConfig,
}

impl BinanceConnector {
    pub fn new(base_url: impl Into<String>, ws: WsConfig) -> Self {
        Self {
            base_url: base_url.into(),
            ws,
        }
    }
}

impl SourceConnector for BinanceConnector {
    fn source(&self) -> Source {
        Source::Binance
    }

    fn endpoint(&self, instrument: Instrument) -> String {
        format!(
            "{}/{}@miniTicker",
            self.base_url.trim_end_matches('/'),
            instrument.symbol().to_lowercase()
        )
    }

    fn subscribe_frames(&self, _instrument: Instrument) -> Vec<String> {
        Vec::new()
    }

    fn ws_config(&self) -> &WsConfig {
        &self.ws
    }
}

/// Bitfinex v2 public ticker channel.
pub struct BitfinexConnector {
    url: String,
    ws: WsConfig,
}

impl BitfinexConnector {
    pub fn new(url: impl Into<String>, ws: WsConfig) -> Self {
        Self {
            url: url.into(),
            ws,
        }
    }
}

impl SourceConnector for BitfinexConnector {
    fn source(&self) -> Source {
        Source::Bitfinex
    }

    fn endpoint(&self, _instrument: Instrument) -> String {
        self.url.clone()
    }

    fn subscribe_frames(&self, instrument: Instrument) -> Vec<String> {
        let frame = json!({
            "event": "subscribe",
            "channel": "ticker",
            "symbol": format!("t{}", instrument.symbol()),
        });
        vec![frame.to_string()]
    }

    fn ws_config(&self) -> &WsConfig {
        &self.ws
    }
}

/// Connection routine for `source` using the configured endpoints.
pub fn connector_for(source: Source, config: &AppConfig) -> Box<dyn SourceConnector> {
    match source {
        Source::Binance => Box::new(BinanceConnector::new(
            config.exchanges.binance_ws_url.clone(),
            config.websocket.clone(),
        )),
        Source::Bitfinex => Box::new(BitfinexConnector::new(
            config.exchanges.bitfinex_ws_url.clone(),
            config.websocket.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiba_core::Ticker;
    use serde_json::Value;

    fn eth_btc() -> Instrument {
        Instrument::new(Ticker::Eth, Ticker::Btc).unwrap()
    }

    #[test]
    fn test_binance_endpoint() {
        let connector = connector_for(Source::Binance, &AppConfig::default());
        assert_eq!(
            connector.endpoint(eth_btc()),
            "wss://stream.binance.com:9443/ws/ethbtc@miniTicker"
        );
        assert!(connector.subscribe_frames(eth_btc()).is_empty());

        let trailing = BinanceConnector::new("ws://127.0.0.1:9000/", WsConfig::default());
        assert_eq!(trailing.endpoint(eth_btc()), "ws://127.0.0.1:9000/ethbtc@miniTicker");
    }

    #[test]
    fn test_bitfinex_subscribe_frame() {
        let connector = connector_for(Source::Bitfinex, &AppConfig::default());
        assert_eq!(connector.endpoint(eth_btc()), "wss://api-pub.bitfinex.com/ws/2");

        let frames = connector.subscribe_frames(eth_btc());
        assert_eq!(frames.len(), 1);
        let frame: Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(frame["event"], "subscribe");
        assert_eq!(frame["channel"], "ticker");
        assert_eq!(frame["symbol"], "tETHBTC");
    }

    #[tokio::test]
    async fn test_connect_labels_and_shuts_down() {
        let ws = WsConfig {
            reconnect_base_delay_ms: 10,
            ..Default::default()
        };
        let connector = BinanceConnector::new("ws://127.0.0.1:1", ws);
        let (tx, _rx) = mpsc::channel(16);

        let handle = connector.connect(eth_btc(), tx);
        assert_eq!(handle.source, Source::Binance);
        assert_eq!(handle.manager().label(), "BINANCE");

        handle.shutdown().await;
    }
}
