// src/server/spawner.rs

//! Spawns the server's long-running tasks.

use super::admin_server;
use super::context::ServerContext;
use crate::core::TransportGateway;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use tracing::info;

/// Spawns the event loop, the accept loop and the admin server into the context's JoinSet.
pub async fn spawn_all(ctx: &mut ServerContext) -> Result<()> {
    let shutdown_tx = &ctx.shutdown_tx;
    let background_tasks = &mut ctx.background_tasks;

    // --- Event Loop ---
    let event_loop = ctx
        .event_loop
        .take()
        .ok_or_else(|| anyhow!("Event loop was already spawned"))?;
    let shutdown_rx_events = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        event_loop.run(shutdown_rx_events).await;
        Ok(())
    });

    // --- Socket Engine ---
    let accept_handle = ctx.transport.start(Arc::new(ctx.events.clone()))?;
    background_tasks.spawn(async move {
        accept_handle
            .await
            .map_err(|e| anyhow!("Accept loop panicked: {:?}", e))
    });

    // --- Admin Server ---
    if let Some(listener) = ctx.admin_listener.take() {
        let gateway: Arc<dyn TransportGateway> = Arc::new(ctx.transport.handle());
        let shutdown_rx_admin = shutdown_tx.subscribe();
        background_tasks.spawn(async move {
            admin_server::run_admin_server(listener, gateway, shutdown_rx_admin).await
        });
    }

    info!("All background tasks have been spawned.");
    Ok(())
}
