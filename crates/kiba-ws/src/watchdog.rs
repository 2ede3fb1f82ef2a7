//! Idle watchdog for WebSocket connections.
//!
//! Exchanges push ticker updates or heartbeats continuously, so a silent
//! socket is treated as dead and recycled by the connection manager.

use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Tracks the time of the last inbound message.
pub struct IdleWatchdog {
    /// Silence allowed before the connection is considered dead.
    timeout_ms: u64,
    /// Last message received time (any frame).
    last_message: RwLock<Instant>,
}

impl IdleWatchdog {
    /// Create a new watchdog.
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_message: RwLock::new(Instant::now()),
        }
    }

    /// Reset state (called on connection).
    pub fn reset(&self) {
        *self.last_message.write() = Instant::now();
    }

    /// Record that any frame was received.
    pub fn record_message(&self) {
        *self.last_message.write() = Instant::now();
    }

    /// Time since last inbound frame.
    pub fn idle_for(&self) -> Duration {
        self.last_message.read().elapsed()
    }

    /// Check if the connection has been silent for too long.
    pub fn is_idle(&self) -> bool {
        let idle_ms = self.idle_for().as_millis() as u64;
        if idle_ms > self.timeout_ms {
            debug!(idle_ms, timeout_ms = self.timeout_ms, "Connection idle");
            return true;
        }
        false
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Wait for the next idle check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(Duration::from_millis((self.timeout_ms / 2).max(1))).await;
    }
}
