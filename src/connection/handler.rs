// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::guard::ConnectionGuard;
use crate::core::protocol::{FrameCodec, MessageFrame, MessageType};
use crate::core::{ChatError, ConnectionId, TransportCallbacks};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

/// Error code reported through `on_error` for socket I/O failures.
pub const TRANSPORT_ERROR_IO: i32 = 1;
/// Error code reported through `on_error` for oversized frames.
pub const TRANSPORT_ERROR_FRAME_TOO_LARGE: i32 = 2;
/// Error code reported through `on_error` for anything else.
pub const TRANSPORT_ERROR_OTHER: i32 = 99;

/// Maps a connection-level failure to the numeric code passed to `on_error`.
pub fn transport_error_code(e: &ChatError) -> i32 {
    match e {
        ChatError::Io(_) => TRANSPORT_ERROR_IO,
        ChatError::FrameTooLarge(_) => TRANSPORT_ERROR_FRAME_TOO_LARGE,
        _ => TRANSPORT_ERROR_OTHER,
    }
}

/// Manages the full lifecycle of a client connection.
///
/// Inbound frames are handed to the callbacks untouched except for `Ping`,
/// which is answered here. Outbound frames arrive on a per-connection queue
/// fed by the gateway.
pub struct ConnectionHandler {
    framed: Framed<TcpStream, FrameCodec>,
    id: ConnectionId,
    addr: SocketAddr,
    callbacks: Arc<dyn TransportCallbacks>,
    outbound_rx: mpsc::Receiver<MessageFrame>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    pub fn new(
        socket: TcpStream,
        codec: FrameCodec,
        id: ConnectionId,
        addr: SocketAddr,
        callbacks: Arc<dyn TransportCallbacks>,
        outbound_rx: mpsc::Receiver<MessageFrame>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            framed: Framed::new(socket, codec),
            id,
            addr,
            callbacks,
            outbound_rx,
            shutdown_rx,
        }
    }

    /// The main event loop for the connection. The guard is dropped on every
    /// exit path, which unregisters the connection and reports the disconnect.
    pub async fn run(mut self, _guard: ConnectionGuard) -> Result<(), ChatError> {
        loop {
            tokio::select! {
                // Prioritize shutdown signals over other events.
                biased;

                _ = self.shutdown_rx.recv() => {
                    info!("Connection handler for {} received shutdown signal.", self.addr);
                    self.flush_pending().await?;
                    break;
                }

                frame = self.outbound_rx.recv() => {
                    let Some(frame) = frame else {
                        debug!("Outbound queue for connection {} closed.", self.id);
                        break;
                    };
                    self.framed.send(frame).await?;
                }

                result = self.framed.next() => {
                    match result {
                        Some(Ok(frame)) => self.handle_frame(frame).await?,
                        Some(Err(e)) => {
                            if is_normal_disconnect(&e) {
                                debug!("Connection from {} closed by peer: {}", self.addr, e);
                            } else {
                                warn!("Connection error for {}: {}", self.addr, e);
                                self.callbacks.on_error(
                                    transport_error_code(&e),
                                    format!("connection {} ({}): {}", self.id, self.addr, e),
                                );
                            }
                            break;
                        }
                        None => {
                            debug!("Connection from {} closed by peer.", self.addr);
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_frame(&mut self, frame: MessageFrame) -> Result<(), ChatError> {
        trace!(
            connection_id = self.id,
            code = frame.code,
            len = frame.payload.len(),
            "Received frame."
        );
        if frame.code == MessageType::Ping.code() {
            self.framed
                .send(MessageFrame::new(MessageType::Pong, Bytes::new()))
                .await?;
            return Ok(());
        }
        self.callbacks
            .on_message(self.id, frame.code, frame.payload);
        Ok(())
    }

    /// Writes whatever is already queued before the socket is closed.
    async fn flush_pending(&mut self) -> Result<(), ChatError> {
        while let Ok(frame) = self.outbound_rx.try_recv() {
            self.framed.feed(frame).await?;
        }
        self.framed.flush().await
    }
}

/// Helper function to check for non-critical disconnection errors.
fn is_normal_disconnect(e: &ChatError) -> bool {
    matches!(e, ChatError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
