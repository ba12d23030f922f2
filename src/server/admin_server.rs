// src/server/admin_server.rs

//! Operator HTTP endpoints: server notices to everyone or to one connection,
//! plus Prometheus metrics.

use crate::core::handler::dispatcher::send_server_notice;
use crate::core::metrics::gather_metrics;
use crate::core::protocol::payloads::AdminMessage;
use crate::core::{ChatError, ConnectionId, TransportGateway};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

type SharedGateway = Arc<dyn TransportGateway>;

/// Builds the admin router around a gateway.
pub fn router(gateway: SharedGateway) -> Router {
    Router::new()
        .route("/api/chat/broadcast", post(broadcast_handler))
        .route("/api/chat/send/{id}", post(send_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(gateway)
}

async fn broadcast_handler(
    State(gateway): State<SharedGateway>,
    Json(body): Json<AdminMessage>,
) -> impl IntoResponse {
    info!("Admin broadcast: {}", body.message);
    status_for(send_server_notice(gateway.as_ref(), None, &body.message))
}

async fn send_handler(
    State(gateway): State<SharedGateway>,
    Path(id): Path<ConnectionId>,
    Json(body): Json<AdminMessage>,
) -> impl IntoResponse {
    info!("Admin notice to connection {}: {}", id, body.message);
    status_for(send_server_notice(gateway.as_ref(), Some(id), &body.message))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

fn status_for(result: Result<(), ChatError>) -> StatusCode {
    match result {
        Ok(()) => StatusCode::OK,
        Err(ChatError::NotConnected(id)) => {
            warn!("Admin notice target {} is not connected.", id);
            StatusCode::NOT_FOUND
        }
        Err(e) => {
            error!("Admin notice failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Serves the admin router until the shutdown signal.
pub async fn run_admin_server(
    listener: TcpListener,
    gateway: SharedGateway,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    info!("Admin server listening on http://{}", addr);

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(async move {
            shutdown_rx.recv().await.ok();
            info!("Admin server shutting down.");
        })
        .await?;
    Ok(())
}
