// src/server/mod.rs

use crate::config::Config;
use crate::core::TransportGateway;
use crate::core::handler::dispatcher::send_server_notice;
use anyhow::{Result, anyhow};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

pub mod admin_server;
mod connection_loop;
mod context;
mod initialization;
mod spawner;
mod transport;

pub use context::ServerContext;
pub use transport::{
    ClientHandle, ClientMap, TcpTransport, TransportHandle, TransportOptions,
};

/// How long background tasks get to finish after the shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Bind sockets and build the core.
    let mut server_context = initialization::setup(config).await?;

    // 2. Spawn the event loop, accept loop and admin server.
    spawner::spawn_all(&mut server_context).await?;

    // 3. Wait for a signal or a failed task, then shut down.
    wait_for_shutdown(&mut server_context).await?;
    shutdown(server_context).await;

    Ok(())
}

async fn wait_for_shutdown(ctx: &mut ServerContext) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;

    tokio::select! {
        biased;

        _ = sigint.recv() => {
            info!("SIGINT received, initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received, initiating graceful shutdown.");
        }
        Some(res) = ctx.background_tasks.join_next() => {
            match res {
                Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                Ok(Err(e)) => error!("CRITICAL: Background task failed: {}. Shutting down.", e),
                Err(e) => error!("CRITICAL: Background task panicked: {e:?}. Shutting down."),
            }
        }
    }
    Ok(())
}

async fn shutdown(mut ctx: ServerContext) {
    if let Some(notice) = &ctx.config.shutdown_notice {
        let gateway = ctx.transport.handle();
        info!(
            "Broadcasting shutdown notice to {} clients.",
            gateway.connection_count()
        );
        if let Err(e) = send_server_notice(&gateway as &dyn TransportGateway, None, notice) {
            warn!("Failed to broadcast shutdown notice: {}", e);
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        error!("Failed to send shutdown signal. Some tasks may not terminate gracefully.");
    }

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        while let Some(res) = ctx.background_tasks.join_next().await {
            match res {
                Ok(Err(e)) => warn!("Background task ended with error during shutdown: {}", e),
                Err(e) if e.is_panic() => error!("Background task panicked during shutdown: {e:?}"),
                _ => {}
            }
        }
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Server shutdown complete.");
}
