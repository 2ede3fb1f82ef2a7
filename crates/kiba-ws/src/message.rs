//! Events delivered from a connection to its consumer.

/// Inbound event from a managed WebSocket connection.
///
/// `label` identifies the connection (the source name), so several
/// connections can share one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// Socket is open and subscription frames were sent.
    Connected { label: String },
    /// Text frame received from the server.
    Text { label: String, text: String },
    /// Socket closed or failed; a reconnect may follow.
    Disconnected { label: String, reason: String },
}

impl WsEvent {
    pub fn label(&self) -> &str {
        match self {
            WsEvent::Connected { label }
            | WsEvent::Text { label, .. }
            | WsEvent::Disconnected { label, .. } => label,
        }
    }
}
