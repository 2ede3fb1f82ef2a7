//! WebSocket connection manager.
//!
//! Handles connection lifecycle, automatic reconnection with exponential backoff,
//! and subscription restoration after reconnection.

use crate::error::{WsError, WsResult};
use crate::message::WsEvent;
use crate::watchdog::IdleWatchdog;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Label attached to every event (source name).
    pub label: String,
    /// WebSocket URL.
    pub url: String,
    /// Frames sent right after every successful connect.
    pub subscribe_messages: Vec<String>,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Silence after which the socket is recycled.
    pub idle_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            url: String::new(),
            subscribe_messages: Vec::new(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
            idle_timeout_ms: 30000,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    watchdog: IdleWatchdog,
    event_tx: mpsc::Sender<WsEvent>,
    reconnect_count: Arc<RwLock<u32>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<WsEvent>) -> Self {
        Self {
            watchdog: IdleWatchdog::new(config.idle_timeout_ms),
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Consecutive failed attempts since the last successful connect.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown.
    ///
    /// Cancels the shutdown token, which will cause both the message loop
    /// and reconnect loop to exit promptly.
    pub fn shutdown(&self) {
        info!(label = %self.config.label, "ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect to WebSocket and run message loop.
    pub async fn connect(&self) -> WsResult<()> {
        self.connect_with_retry().await
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            *self.state.write() = ConnectionState::Connecting;

            let reason = match self.try_connect().await {
                Ok(()) => {
                    info!(label = %self.config.label, "WebSocket connection closed");
                    "closed".to_string()
                }
                Err(e) => {
                    error!(label = %self.config.label, ?e, "WebSocket connection error");
                    e.to_string()
                }
            };

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            self.emit(WsEvent::Disconnected {
                label: self.config.label.clone(),
                reason,
            })
            .await;

            let attempt = self.reconnect_count().saturating_add(1);
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(label = %self.config.label, attempt, "Max reconnection attempts reached");
                *self.state.write() = ConnectionState::Disconnected;
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            *self.state.write() = ConnectionState::Reconnecting;

            let delay = self.calculate_backoff_delay(attempt);
            warn!(label = %self.config.label, attempt, delay_ms = delay.as_millis(), "Reconnecting");

            // Wait for delay OR shutdown signal (cancellation-aware sleep)
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(label = %self.config.label, url = %self.config.url, "Connecting to WebSocket");

        // TCP_NODELAY: ticks are tiny and latency-sensitive
        let (ws_stream, _response) =
            connect_async_tls_with_config(&self.config.url, None, true, None).await?;
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ConnectionState::Connected;
        *self.reconnect_count.write() = 0;
        info!(label = %self.config.label, "WebSocket connected");

        for frame in &self.config.subscribe_messages {
            write.send(Message::Text(frame.clone())).await?;
            debug!(label = %self.config.label, %frame, "Subscription sent");
        }

        self.watchdog.reset();
        self.emit(WsEvent::Connected {
            label: self.config.label.clone(),
        })
        .await;

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!(label = %self.config.label, "Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.watchdog.record_message();
                            self.emit(WsEvent::Text {
                                label: self.config.label.clone(),
                                text,
                            })
                            .await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.watchdog.record_message();
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(label = %self.config.label, code, %reason, "WebSocket closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(label = %self.config.label, ?e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!(label = %self.config.label, "WebSocket stream ended");
                            return Ok(());
                        }
                        Some(Ok(_)) => {
                            self.watchdog.record_message();
                        }
                    }
                }

                _ = self.watchdog.wait_for_check() => {
                    if self.watchdog.is_idle() {
                        error!(label = %self.config.label, "Idle timeout");
                        return Err(WsError::IdleTimeout(self.watchdog.timeout_ms()));
                    }
                }
            }
        }
    }

    async fn emit(&self, event: WsEvent) {
        if self.event_tx.send(event).await.is_err() {
            warn!(label = %self.config.label, "Event receiver dropped");
        }
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // base * 2^(attempt-1), capped
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent);
        let delay = delay.min(max);

        Duration::from_millis(delay + rand_jitter(base))
    }
}

/// Random jitter in `0..min(base, 1000)` ms.
fn rand_jitter(base: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let span = base.clamp(1, 1000);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % span
}
