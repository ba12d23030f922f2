// src/core/handler/dispatcher.rs

//! The central component for routing inbound messages to their handlers.
//!
//! The `Dispatcher` owns the session registry and the file transfer manager. It
//! is driven by exactly one task (the event loop), so none of that state needs
//! locking. Every message goes through the same steps: allow-list check,
//! handler lookup, invocation, and delivery of the resulting `HandlerResult`.

use super::handler_trait::HandlerContext;
use super::pipeline::protocol_check;
use super::registry::HandlerRegistry;
use super::result::{HandlerResult, Outbound};
use crate::core::protocol::MessageType;
use crate::core::protocol::payloads::{self, ServerNotice, UserNotice};
use crate::core::state::{FileTransferManager, SessionRegistry};
use crate::core::{ChatError, ConnectionId, TransportGateway, metrics};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub struct Dispatcher {
    registry: HandlerRegistry,
    sessions: SessionRegistry,
    transfers: FileTransferManager,
    gateway: Arc<dyn TransportGateway>,
}

impl Dispatcher {
    pub fn new(
        registry: HandlerRegistry,
        transfers: FileTransferManager,
        gateway: Arc<dyn TransportGateway>,
    ) -> Self {
        Self {
            registry,
            sessions: SessionRegistry::new(),
            transfers,
            gateway,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn transfers(&self) -> &FileTransferManager {
        &self.transfers
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn on_connected(&mut self, id: ConnectionId, remote_addr: String) {
        info!(connection_id = id, remote_addr = %remote_addr, "Client connected.");
        self.sessions.on_connect(id, remote_addr);
    }

    /// Drops all state for the connection and announces the departure of a
    /// logged-in user.
    pub async fn on_disconnected(&mut self, id: ConnectionId) {
        self.transfers.cancel(id, "connection closed").await;
        let nickname = self.sessions.on_disconnect(id);
        metrics::AUTHENTICATED_USERS.set(self.sessions.authenticated_count() as f64);
        info!(connection_id = id, nickname = ?nickname, "Client disconnected.");

        if let Some(nickname) = nickname {
            match Outbound::json(MessageType::UserLeaveNotice, &UserNotice { nickname }) {
                Ok(notice) => self.send_broadcast(notice, Some(id)),
                Err(e) => error!("Failed to encode leave notice: {}", e),
            }
        }
    }

    pub fn on_transport_error(&self, code: i32, message: &str) {
        error!(code, "Transport error: {}", message);
    }

    /// Processes one inbound message end to end. Never fails: every error
    /// becomes a reply to the sender.
    pub async fn dispatch(&mut self, id: ConnectionId, code: u16, payload: Bytes) {
        let span = info_span!(
            "message",
            connection.id = id,
            msg.code = code,
            msg.len = payload.len(),
        );

        async move {
            let start_time = Instant::now();

            let msg_type = match protocol_check::check_client_message_type(code) {
                Ok(msg_type) => msg_type,
                Err(e) => {
                    metrics::PROTOCOL_VIOLATIONS_TOTAL.inc();
                    warn!(
                        connection_id = id,
                        "Protocol violation: client sent message code {}: {}", code, e
                    );
                    self.send_direct(id, HandlerResult::error(&e));
                    return;
                }
            };
            let type_name: &'static str = msg_type.into();
            metrics::MESSAGES_PROCESSED_TOTAL
                .with_label_values(&[type_name])
                .inc();

            let Some(handler) = self.registry.get(msg_type) else {
                warn!(
                    connection_id = id,
                    "No handler registered for valid message type {}; dropping.", msg_type
                );
                return;
            };

            let mut ctx = HandlerContext {
                sessions: &mut self.sessions,
                transfers: &mut self.transfers,
            };
            let result = match handler.handle(&mut ctx, id, payload).await {
                Ok(result) => result,
                Err(e) => {
                    metrics::HANDLER_ERRORS_TOTAL
                        .with_label_values(&[e.code()])
                        .inc();
                    debug!(connection_id = id, "Handler for {} failed: {}", msg_type, e);
                    HandlerResult::error(&e)
                }
            };

            self.realize(id, result);
            metrics::DISPATCH_LATENCY_SECONDS.observe(start_time.elapsed().as_secs_f64());
        }
        .instrument(span)
        .await
    }

    /// Cancels every in-flight upload. Called once the event loop has drained.
    pub async fn shutdown(&mut self) {
        let cancelled = self.transfers.cancel_all("server shutting down").await;
        if cancelled > 0 {
            info!("Cancelled {} in-flight file transfers.", cancelled);
            metrics::TRANSFERS_FAILED_TOTAL.inc_by(cancelled as f64);
        }
    }

    /// Sends the direct part to the sender and the broadcast part to everyone else.
    fn realize(&self, origin: ConnectionId, result: HandlerResult) {
        let (direct, broadcast) = result.into_parts();
        if let Some(direct) = direct {
            self.send_to(origin, direct);
        }
        if let Some(broadcast) = broadcast {
            self.send_broadcast(broadcast, Some(origin));
        }
    }

    fn send_direct(&self, id: ConnectionId, result: HandlerResult) {
        if let (Some(direct), _) = result.into_parts() {
            self.send_to(id, direct);
        }
    }

    fn send_to(&self, id: ConnectionId, outbound: Outbound) {
        if let Err(e) = self
            .gateway
            .send_to_connection(id, outbound.msg_type, outbound.payload)
        {
            metrics::SEND_FAILURES_TOTAL.inc();
            error!(connection_id = id, "Failed to send {}: {}", outbound.msg_type, e);
        }
    }

    fn send_broadcast(&self, outbound: Outbound, exclude: Option<ConnectionId>) {
        if let Err(e) = self
            .gateway
            .broadcast(outbound.msg_type, outbound.payload, exclude)
        {
            metrics::SEND_FAILURES_TOTAL.inc();
            error!("Failed to broadcast {}: {}", outbound.msg_type, e);
        }
    }
}

/// Sends an operator notice straight through the gateway, bypassing the
/// client allow-list. `target` of `None` reaches every connection.
pub fn send_server_notice(
    gateway: &dyn TransportGateway,
    target: Option<ConnectionId>,
    message: &str,
) -> Result<(), ChatError> {
    let payload = payloads::encode(&ServerNotice::new(message))?;
    match target {
        Some(id) => gateway.send_to_connection(id, MessageType::ServerNotice, payload),
        None => gateway.broadcast(MessageType::ServerNotice, payload, None),
    }
}
