//! WebSocket lifecycle integration tests.
//!
//! Tests the connection lifecycle:
//! - Connection establishment
//! - Subscription frames sent after connect
//! - Reconnection limits

mod integration;
use integration::common::mock_ws::{bitfinex_subscribed, MockWsServer, Script};

use kiba_ws::{ConnectionConfig, ConnectionManager, ConnectionState, WsEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Test that ConnectionManager can connect to a WebSocket server.
#[tokio::test]
async fn test_ws_connects_to_server() {
    let server = MockWsServer::start(Script::default()).await;

    let config = ConnectionConfig {
        label: "BINANCE".to_string(),
        url: server.url(),
        max_reconnect_attempts: 3,
        ..Default::default()
    };
    let (event_tx, mut event_rx) = mpsc::channel::<WsEvent>(100);
    let manager = Arc::new(ConnectionManager::new(config, event_tx));

    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    let event = timeout(Duration::from_secs(2), event_rx.recv())
        .await
        .expect("Should connect within timeout")
        .expect("Channel open");
    assert_eq!(
        event,
        WsEvent::Connected {
            label: "BINANCE".to_string()
        }
    );
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(server.connection_count().await, 1);

    manager.shutdown();
    let _ = timeout(Duration::from_secs(2), handle).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    server.shutdown().await;
}

/// Test that subscription frames are sent and answered.
#[tokio::test]
async fn test_ws_sends_subscriptions() {
    let server = MockWsServer::start(Script {
        on_message: vec![bitfinex_subscribed(7, "tETHBTC")],
        ..Default::default()
    })
    .await;

    let subscribe = serde_json::json!({
        "event": "subscribe",
        "channel": "ticker",
        "symbol": "tETHBTC"
    })
    .to_string();

    let config = ConnectionConfig {
        label: "BITFINEX".to_string(),
        url: server.url(),
        subscribe_messages: vec![subscribe.clone()],
        ..Default::default()
    };
    let (event_tx, mut event_rx) = mpsc::channel::<WsEvent>(100);
    let manager = Arc::new(ConnectionManager::new(config, event_tx));

    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    let reply = timeout(Duration::from_secs(2), async {
        loop {
            match event_rx.recv().await {
                Some(WsEvent::Text { label, text }) => return (label, text),
                Some(_) => continue,
                None => panic!("Channel closed"),
            }
        }
    })
    .await
    .expect("Should receive subscription reply");

    assert_eq!(reply.0, "BITFINEX");
    assert!(reply.1.contains("\"subscribed\""));
    assert_eq!(server.received_messages().await, vec![subscribe]);

    manager.shutdown();
    let _ = timeout(Duration::from_secs(2), handle).await;
    server.shutdown().await;
}

/// Test that a socket closed by the server is reopened.
#[tokio::test]
async fn test_ws_reconnects_after_server_close() {
    let closing = MockWsServer::start(Script {
        close_after_connect: true,
        ..Default::default()
    })
    .await;

    let config = ConnectionConfig {
        label: "BINANCE".to_string(),
        url: closing.url(),
        reconnect_base_delay_ms: 20,
        ..Default::default()
    };
    let (event_tx, mut event_rx) = mpsc::channel::<WsEvent>(100);
    let manager = Arc::new(ConnectionManager::new(config, event_tx));

    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    let connects = timeout(Duration::from_secs(5), async {
        let mut connects = 0;
        let mut disconnects = 0;
        while connects < 2 || disconnects < 1 {
            match event_rx.recv().await {
                Some(WsEvent::Connected { .. }) => connects += 1,
                Some(WsEvent::Disconnected { .. }) => disconnects += 1,
                Some(_) => {}
                None => break,
            }
        }
        connects
    })
    .await
    .expect("Should reconnect after server close");

    assert!(connects >= 2);
    assert!(closing.connection_count().await >= 2);

    manager.shutdown();
    let _ = timeout(Duration::from_secs(2), handle).await;
    closing.shutdown().await;
}

/// Test that connection respects max reconnect attempts.
#[tokio::test]
async fn test_ws_respects_max_reconnect_attempts() {
    let config = ConnectionConfig {
        label: "BINANCE".to_string(),
        url: "ws://127.0.0.1:59999".to_string(), // Invalid port
        max_reconnect_attempts: 2,
        reconnect_base_delay_ms: 100,
        ..Default::default()
    };
    let (event_tx, mut event_rx) = mpsc::channel::<WsEvent>(100);
    let manager = Arc::new(ConnectionManager::new(config, event_tx));

    let result = timeout(Duration::from_secs(5), async { manager.connect().await }).await;

    assert!(result.is_ok(), "Should stop after max reconnect attempts");
    assert!(result.unwrap().is_err());
    assert!(matches!(
        event_rx.try_recv(),
        Ok(WsEvent::Disconnected { .. })
    ));
}
