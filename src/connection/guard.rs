// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use crate::core::{ConnectionId, TransportCallbacks, metrics};
use crate::server::ClientMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tracing::debug;

/// An RAII guard to ensure connection resources are always cleaned up when a
/// connection handler's scope is exited, whatever the exit path.
pub struct ConnectionGuard {
    clients: Arc<ClientMap>,
    callbacks: Arc<dyn TransportCallbacks>,
    id: ConnectionId,
    addr: SocketAddr,
    /// Held for the life of the connection; dropping it frees a client slot.
    _permit: OwnedSemaphorePermit,
}

impl ConnectionGuard {
    pub(crate) fn new(
        clients: Arc<ClientMap>,
        callbacks: Arc<dyn TransportCallbacks>,
        id: ConnectionId,
        addr: SocketAddr,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        metrics::CONNECTED_CLIENTS.inc();
        Self {
            clients,
            callbacks,
            id,
            addr,
            _permit: permit,
        }
    }
}

impl Drop for ConnectionGuard {
    /// Removes the client from the outbound map and tells the core it is gone.
    fn drop(&mut self) {
        metrics::CONNECTED_CLIENTS.dec();
        debug!(
            "ConnectionGuard dropping, cleaning up resources for connection {} ({})",
            self.id, self.addr
        );

        if self.clients.remove(&self.id).is_none() {
            debug!(
                "Client {} was not in the client map upon cleanup.",
                self.addr
            );
        }
        self.callbacks.on_disconnected(self.id);
    }
}
