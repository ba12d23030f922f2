// src/core/handler/actions/chat_text.rs

use crate::core::handler::pipeline::auth_check;
use crate::core::handler::{HandlerContext, HandlerResult, MessageHandler};
use crate::core::protocol::MessageType;
use crate::core::protocol::payloads::{self, ChatTextBroadcast, ChatTextRequest};
use crate::core::{ChatError, ConnectionId};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

/// Handles `ChatText`: relays a logged-in user's message to everyone else.
pub struct ChatTextHandler;

#[async_trait]
impl MessageHandler for ChatTextHandler {
    fn message_type(&self) -> MessageType {
        MessageType::ChatText
    }

    async fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        id: ConnectionId,
        payload: Bytes,
    ) -> Result<HandlerResult, ChatError> {
        let author = auth_check::require_login(ctx.sessions, id)?;
        let request: ChatTextRequest = payloads::decode(&payload)?;

        let Some(content) = request.message.filter(|m| !m.trim().is_empty()) else {
            trace!(connection_id = id, "Ignoring blank chat message.");
            return Ok(HandlerResult::empty());
        };

        HandlerResult::broadcast(
            MessageType::ChatText,
            &ChatTextBroadcast::new(author, content),
        )
    }
}
