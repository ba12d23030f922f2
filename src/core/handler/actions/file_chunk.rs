// src/core/handler/actions/file_chunk.rs

use crate::core::handler::{HandlerContext, HandlerResult, MessageHandler};
use crate::core::protocol::MessageType;
use crate::core::{ChatError, ConnectionId, metrics};
use async_trait::async_trait;
use bytes::Bytes;

/// Handles `FileChunk`: appends raw bytes to the sender's active upload.
pub struct FileChunkHandler;

#[async_trait]
impl MessageHandler for FileChunkHandler {
    fn message_type(&self) -> MessageType {
        MessageType::FileChunk
    }

    async fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        id: ConnectionId,
        payload: Bytes,
    ) -> Result<HandlerResult, ChatError> {
        match ctx.transfers.append_chunk(id, &payload).await {
            Ok(_) => {
                metrics::BYTES_UPLOADED_TOTAL.inc_by(payload.len() as f64);
                Ok(HandlerResult::empty())
            }
            Err(e) => {
                if e.is_transfer_failure() {
                    metrics::TRANSFERS_FAILED_TOTAL.inc();
                }
                Err(e)
            }
        }
    }
}
