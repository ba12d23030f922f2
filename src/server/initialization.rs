// src/server/initialization.rs

//! Builds every server component before the accept loop starts.

use super::context::ServerContext;
use super::transport::{TcpTransport, TransportOptions};
use crate::config::Config;
use crate::core::events::{self, EventLoop};
use crate::core::handler::{Dispatcher, HandlerRegistry};
use crate::core::state::FileTransferManager;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create upload directory '{}'",
                config.upload_dir.display()
            )
        })?;

    let transport = TcpTransport::bind(
        &config.host,
        config.port,
        config.max_clients,
        TransportOptions {
            outbound_queue_capacity: config.outbound_queue_capacity,
            max_payload_bytes: config.max_payload_bytes,
        },
    )
    .await
    .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?
    .with_shutdown(shutdown_tx.clone());

    let registry = HandlerRegistry::with_default_handlers()?;
    let dispatcher = Dispatcher::new(
        registry,
        FileTransferManager::new(config.upload_dir.clone()),
        Arc::new(transport.handle()),
    );
    let (events, event_rx) = events::channel(config.event_queue_capacity);
    let event_loop = EventLoop::new(dispatcher, event_rx);

    let admin_listener = if config.admin.enabled {
        let listener = TcpListener::bind((config.admin.host.as_str(), config.admin.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind admin server on {}:{}",
                    config.admin.host, config.admin.port
                )
            })?;
        Some(listener)
    } else {
        info!("Admin HTTP server is disabled in the configuration.");
        None
    };

    Ok(ServerContext {
        config,
        transport,
        events,
        event_loop: Some(event_loop),
        admin_listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Accepting up to {} clients; uploads go to '{}'.",
        config.max_clients,
        config.upload_dir.display()
    );
    info!(
        "Event queue capacity {}, outbound queue capacity {}, max payload {} bytes.",
        config.event_queue_capacity, config.outbound_queue_capacity, config.max_payload_bytes
    );
}
