//! WebSocket client for kiba exchange connections.
//!
//! Provides one managed connection per market-data source with:
//! - Automatic reconnection with exponential backoff
//! - Subscription frames replayed after every reconnect
//! - Idle watchdog (no inbound traffic forces a reconnect)
//! - Channel-based delivery of inbound frames, tagged with the source label

pub mod connection;
pub mod error;
pub mod message;
pub mod watchdog;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use message::WsEvent;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
