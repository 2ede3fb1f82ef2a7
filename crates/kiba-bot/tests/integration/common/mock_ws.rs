//! Mock exchange WebSocket server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections
//! - Push scripted frames right after the handshake
//! - Answer every client text frame with scripted replies
//! - Record received messages

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Frames the server plays to each connection.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Sent right after the handshake.
    pub on_connect: Vec<String>,
    /// Sent in reply to each client text frame.
    pub on_message: Vec<String>,
    /// Close the socket once `on_connect` frames are out.
    pub close_after_connect: bool,
    /// Hold `on_message` replies until the gate reads `true`.
    pub gate: Option<watch::Receiver<bool>>,
}

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
}

impl MockWsServer {
    /// Start a new mock WebSocket server on an available port.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let messages = messages_clone.clone();
                        let connections = connections_clone.clone();
                        tokio::spawn(handle_connection(stream, script.clone(), messages, connections));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            connections,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Get all received messages.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.iter().cloned().collect()
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: Script,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
) {
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    for frame in &script.on_connect {
        if write.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }
    if script.close_after_connect {
        let _ = write.send(Message::Close(None)).await;
        return;
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                {
                    let mut msgs = messages.lock().await;
                    msgs.push_back(text.clone());
                }
                if let Some(mut gate) = script.gate.clone() {
                    if gate.wait_for(|open| *open).await.is_err() {
                        return;
                    }
                }
                for frame in &script.on_message {
                    let _ = write.send(Message::Text(frame.clone())).await;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }
}

/// Binance mini ticker frame.
pub fn binance_mini_ticker(symbol: &str, close: &str) -> String {
    serde_json::json!({
        "e": "24hrMiniTicker",
        "E": 1_672_515_782_136u64,
        "s": symbol,
        "c": close,
        "o": close,
        "h": close,
        "l": close,
        "v": "100",
        "q": "10"
    })
    .to_string()
}

/// Bitfinex `subscribed` event.
pub fn bitfinex_subscribed(chan_id: u64, symbol: &str) -> String {
    serde_json::json!({
        "event": "subscribed",
        "channel": "ticker",
        "chanId": chan_id,
        "symbol": symbol,
        "pair": symbol.trim_start_matches('t')
    })
    .to_string()
}

/// Bitfinex ticker update with the given ask.
pub fn bitfinex_ticker(chan_id: u64, ask: f64) -> String {
    serde_json::json!([chan_id, [ask - 0.0001, 10.0, ask, 12.0, 0.0, 0.0, ask, 1000.0, ask, ask]])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start(Script::default()).await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
