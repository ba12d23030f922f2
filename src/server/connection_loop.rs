// src/server/connection_loop.rs

//! Contains the accept loop for client connections and its graceful shutdown.

use super::transport::{ClientHandle, ClientMap};
use crate::connection::{ConnectionGuard, ConnectionHandler};
use crate::core::protocol::FrameCodec;
use crate::core::{ConnectionId, TransportCallbacks, metrics};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// How long open connections get to flush and close after shutdown.
const CONNECTION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) struct AcceptLoop {
    pub(crate) listener: TcpListener,
    pub(crate) clients: Arc<ClientMap>,
    pub(crate) permits: Arc<Semaphore>,
    pub(crate) codec: FrameCodec,
    pub(crate) outbound_queue_capacity: usize,
    pub(crate) callbacks: Arc<dyn TransportCallbacks>,
    pub(crate) shutdown_tx: broadcast::Sender<()>,
}

impl AcceptLoop {
    /// Accepts connections until the shutdown signal, then waits for the
    /// connection tasks to finish.
    pub(crate) async fn run(self) {
        let mut next_id: ConnectionId = 0;
        let mut client_tasks = JoinSet::new();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Accept loop received shutdown signal.");
                    break;
                }

                res = self.listener.accept() => {
                    let (socket, addr) = match res {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    let Ok(permit) = self.permits.clone().try_acquire_owned() else {
                        warn!("Client limit reached. Rejecting connection from {}", addr);
                        metrics::CONNECTIONS_REJECTED_TOTAL.inc();
                        drop(socket);
                        continue;
                    };

                    info!("Accepted new connection from: {}", addr);
                    metrics::CONNECTIONS_RECEIVED_TOTAL.inc();
                    if let Err(e) = socket.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    next_id = next_id.wrapping_add(1);
                    let id = next_id;

                    let (outbound_tx, outbound_rx) = mpsc::channel(self.outbound_queue_capacity);
                    self.clients.insert(id, ClientHandle { addr, outbound: outbound_tx });
                    let guard = ConnectionGuard::new(
                        self.clients.clone(),
                        self.callbacks.clone(),
                        id,
                        addr,
                        permit,
                    );

                    // Reported before the handler task exists so it precedes any message.
                    self.callbacks.on_connected(id, addr.to_string());

                    let handler = ConnectionHandler::new(
                        socket,
                        self.codec.clone(),
                        id,
                        addr,
                        self.callbacks.clone(),
                        outbound_rx,
                        self.shutdown_tx.subscribe(),
                    );
                    client_tasks.spawn(async move {
                        if let Err(e) = handler.run(guard).await {
                            warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                        }
                    });
                },

                Some(res) = client_tasks.join_next() => {
                    if let Err(e) = res
                        && e.is_panic()
                    {
                        error!("A client handler panicked: {e:?}");
                    }
                },
            }
        }

        drop(self.listener);
        if tokio::time::timeout(CONNECTION_DRAIN_TIMEOUT, async {
            while client_tasks.join_next().await.is_some() {}
        })
        .await
        .is_err()
        {
            warn!("Timed out waiting for client connections to close; aborting them.");
            client_tasks.shutdown().await;
        }
        info!("All client connections closed.");
    }
}
