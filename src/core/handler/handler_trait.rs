// src/core/handler/handler_trait.rs

//! Defines the trait every inbound message handler implements.

use super::result::HandlerResult;
use crate::core::protocol::MessageType;
use crate::core::state::{FileTransferManager, SessionRegistry};
use crate::core::{ChatError, ConnectionId};
use async_trait::async_trait;
use bytes::Bytes;

/// Mutable access to the state a handler may touch.
///
/// The dispatcher builds one per message; handlers never hold state of their own.
pub struct HandlerContext<'a> {
    pub sessions: &'a mut SessionRegistry,
    pub transfers: &'a mut FileTransferManager,
}

/// Handles one inbound message type.
///
/// An `Err` is turned into a single `ErrorResponse` for the sender by the
/// dispatcher. Handlers that need to pair an error with a broadcast return
/// `Ok` with an error reply instead.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// The message type this handler is registered under.
    fn message_type(&self) -> MessageType;

    async fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        id: ConnectionId,
        payload: Bytes,
    ) -> Result<HandlerResult, ChatError>;
}
