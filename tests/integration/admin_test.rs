// tests/integration/admin_test.rs

//! Integration tests for the operator HTTP endpoints.

use super::test_helpers::{RecordingGateway, init_tracing};
use bytes::Bytes;
use chatrelay::core::protocol::MessageType;
use chatrelay::core::protocol::payloads::ServerNotice;
use chatrelay::core::{ChatError, ConnectionId, TransportGateway, metrics};
use chatrelay::server::admin_server::run_admin_server;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// A gateway whose queues are always full.
struct SaturatedGateway;

impl TransportGateway for SaturatedGateway {
    fn send_to_connection(&self, id: ConnectionId, _: MessageType, _: Bytes) -> Result<(), ChatError> {
        Err(ChatError::Transport(format!("outbound queue for connection {id} is full")))
    }

    fn broadcast(&self, _: MessageType, _: Bytes, _: Option<ConnectionId>) -> Result<(), ChatError> {
        Err(ChatError::Transport("broadcast failed".into()))
    }
}

async fn start_admin(gateway: Arc<dyn TransportGateway>) -> (SocketAddr, broadcast::Sender<()>) {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(run_admin_server(listener, gateway, shutdown_rx));
    (addr, shutdown_tx)
}

#[tokio::test]
async fn test_broadcast_endpoint() {
    let gateway = Arc::new(RecordingGateway::new());
    let (addr, _shutdown) = start_admin(gateway.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat/broadcast"))
        .json(&json!({ "message": "Maintenance in 5 minutes" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let sent = gateway.broadcasts();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].msg_type, MessageType::ServerNotice);
    assert_eq!(sent[0].exclude, None);
    let notice: ServerNotice = sent[0].json();
    assert_eq!(notice.message, "Maintenance in 5 minutes");
}

#[tokio::test]
async fn test_send_endpoint() {
    let gateway = Arc::new(RecordingGateway::new());
    let (addr, _shutdown) = start_admin(gateway.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat/send/3"))
        .json(&json!({ "message": "hello three" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let sent = gateway.directs_to(3);
    assert_eq!(sent.len(), 1);
    let notice: ServerNotice = sent[0].json();
    assert_eq!(notice.message, "hello three");
}

#[tokio::test]
async fn test_send_to_unknown_connection_is_not_found() {
    let gateway = Arc::new(RecordingGateway::new());
    gateway.mark_unreachable(99);
    let (addr, _shutdown) = start_admin(gateway.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat/send/99"))
        .json(&json!({ "message": "anyone?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_saturated_gateway_is_unavailable() {
    let (addr, _shutdown) = start_admin(Arc::new(SaturatedGateway)).await;
    let client = reqwest::Client::new();

    let broadcast = client
        .post(format!("http://{addr}/api/chat/broadcast"))
        .json(&json!({ "message": "x" }))
        .send()
        .await
        .unwrap();
    let direct = client
        .post(format!("http://{addr}/api/chat/send/1"))
        .json(&json!({ "message": "x" }))
        .send()
        .await
        .unwrap();

    assert_eq!(broadcast.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(direct.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let gateway = Arc::new(RecordingGateway::new());
    let (addr, _shutdown) = start_admin(gateway.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat/broadcast"))
        .json(&json!({ "text": "wrong field" }))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert!(gateway.all().is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    metrics::CONNECTED_CLIENTS.get();
    let (addr, _shutdown) = start_admin(Arc::new(RecordingGateway::new())).await;

    let response = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("chatrelay_connected_clients"));
}
