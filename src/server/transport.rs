// src/server/transport.rs

//! The tokio TCP socket engine: accepts connections, frames bytes, and
//! implements `TransportGateway` on top of per-connection outbound queues.

use super::connection_loop::AcceptLoop;
use crate::core::protocol::{FrameCodec, MessageFrame, MessageType};
use crate::core::{ChatError, ConnectionId, TransportCallbacks, TransportGateway};
use bytes::Bytes;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The outbound side of one live connection.
#[derive(Debug)]
pub struct ClientHandle {
    pub addr: SocketAddr,
    pub(crate) outbound: mpsc::Sender<MessageFrame>,
}

/// All live connections, keyed by id.
pub type ClientMap = DashMap<ConnectionId, ClientHandle>;

/// Tunables for the socket engine.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub outbound_queue_capacity: usize,
    pub max_payload_bytes: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: 1024,
            max_payload_bytes: crate::core::protocol::frame::DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// A cheap, cloneable gateway into the live connection map.
#[derive(Clone)]
pub struct TransportHandle {
    clients: Arc<ClientMap>,
}

impl TransportHandle {
    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.clients.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    fn enqueue(
        id: ConnectionId,
        client: &ClientHandle,
        frame: MessageFrame,
    ) -> Result<(), ChatError> {
        match client.outbound.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ChatError::Transport(format!(
                "outbound queue for connection {id} is full"
            ))),
            Err(TrySendError::Closed(_)) => Err(ChatError::NotConnected(id)),
        }
    }
}

impl TransportGateway for TransportHandle {
    fn send_to_connection(
        &self,
        id: ConnectionId,
        msg_type: MessageType,
        payload: Bytes,
    ) -> Result<(), ChatError> {
        let client = self.clients.get(&id).ok_or(ChatError::NotConnected(id))?;
        Self::enqueue(id, client.value(), MessageFrame::new(msg_type, payload))
    }

    fn broadcast(
        &self,
        msg_type: MessageType,
        payload: Bytes,
        exclude: Option<ConnectionId>,
    ) -> Result<(), ChatError> {
        let mut failed = 0usize;
        for entry in self.clients.iter() {
            let id = *entry.key();
            if Some(id) == exclude {
                continue;
            }
            // Bytes clones share the buffer.
            let frame = MessageFrame::new(msg_type, payload.clone());
            if let Err(e) = Self::enqueue(id, entry.value(), frame) {
                warn!("Broadcast of {} to connection {} failed: {}", msg_type, id, e);
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(ChatError::Transport(format!(
                "broadcast of {msg_type} failed for {failed} connection(s)"
            )));
        }
        Ok(())
    }
}

/// A bound TCP server, not yet accepting until [`start`](Self::start) is called.
pub struct TcpTransport {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: Arc<ClientMap>,
    permits: Arc<Semaphore>,
    options: TransportOptions,
    shutdown_tx: broadcast::Sender<()>,
}

impl TcpTransport {
    /// Binds the listening socket. Port 0 picks a free port.
    pub async fn bind(
        host: &str,
        port: u16,
        max_connections: usize,
        options: TransportOptions,
    ) -> Result<Self, ChatError> {
        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;
        info!("chatrelay server listening on {}", local_addr);
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            listener: Some(listener),
            local_addr,
            clients: Arc::new(ClientMap::new()),
            permits: Arc::new(Semaphore::new(max_connections)),
            options,
            shutdown_tx,
        })
    }

    /// Uses an existing shutdown channel instead of a private one.
    pub fn with_shutdown(mut self, shutdown_tx: broadcast::Sender<()>) -> Self {
        self.shutdown_tx = shutdown_tx;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            clients: self.clients.clone(),
        }
    }

    /// Starts accepting connections, delivering notifications to `callbacks`.
    pub fn start(
        &mut self,
        callbacks: Arc<dyn TransportCallbacks>,
    ) -> Result<JoinHandle<()>, ChatError> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| ChatError::Transport("transport already started".into()))?;

        let accept_loop = AcceptLoop {
            listener,
            clients: self.clients.clone(),
            permits: self.permits.clone(),
            codec: FrameCodec::new(self.options.max_payload_bytes),
            outbound_queue_capacity: self.options.outbound_queue_capacity,
            callbacks,
            shutdown_tx: self.shutdown_tx.clone(),
        };
        Ok(tokio::spawn(accept_loop.run()))
    }

    /// Stops accepting and closes every connection after flushing queued frames.
    pub fn shutdown(&self) {
        if self.shutdown_tx.send(()).is_err() {
            debug!("Transport shutdown requested with no running tasks.");
        }
    }
}
