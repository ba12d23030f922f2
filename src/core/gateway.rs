// src/core/gateway.rs

//! The narrow seams between the core and whatever socket engine carries the bytes.

use crate::core::protocol::MessageType;
use crate::core::{ChatError, ConnectionId};
use bytes::Bytes;

/// Outbound side: how the core hands bytes back to the socket engine.
///
/// Implementations must not block the caller for long; the event loop calls
/// these methods inline.
pub trait TransportGateway: Send + Sync {
    /// Queues one framed message for a single connection.
    fn send_to_connection(
        &self,
        id: ConnectionId,
        msg_type: MessageType,
        payload: Bytes,
    ) -> Result<(), ChatError>;

    /// Queues one framed message for every connection except `exclude`.
    fn broadcast(
        &self,
        msg_type: MessageType,
        payload: Bytes,
        exclude: Option<ConnectionId>,
    ) -> Result<(), ChatError>;
}

/// Inbound side: notifications the socket engine delivers, possibly from many tasks at once.
pub trait TransportCallbacks: Send + Sync {
    fn on_connected(&self, id: ConnectionId, remote_addr: String);
    fn on_disconnected(&self, id: ConnectionId);
    /// `msg_type` is the raw numeric code; validating it is the core's job.
    fn on_message(&self, id: ConnectionId, msg_type: u16, payload: Bytes);
    fn on_error(&self, code: i32, message: String);
}
