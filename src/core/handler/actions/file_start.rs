// src/core/handler/actions/file_start.rs

use crate::core::handler::pipeline::auth_check;
use crate::core::handler::{HandlerContext, HandlerResult, MessageHandler};
use crate::core::protocol::MessageType;
use crate::core::protocol::payloads::{
    self, FileStartRequest, FileStatusNotice, ServerNotice, TransferStatus,
};
use crate::core::{ChatError, ConnectionId};
use async_trait::async_trait;
use bytes::Bytes;

/// Handles `FileInfo`: opens a new upload for a logged-in user.
pub struct FileStartHandler;

#[async_trait]
impl MessageHandler for FileStartHandler {
    fn message_type(&self) -> MessageType {
        MessageType::FileInfo
    }

    async fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        id: ConnectionId,
        payload: Bytes,
    ) -> Result<HandlerResult, ChatError> {
        let nickname = auth_check::require_login(ctx.sessions, id)?;
        let request: FileStartRequest = payloads::decode(&payload)?;

        let filename = request.filename.trim();
        if filename.is_empty() || request.filesize <= 0 {
            return Err(ChatError::InvalidFileMetadata);
        }

        let session = ctx.transfers.start(id, filename, request.filesize).await?;
        let notice = FileStatusNotice {
            nickname,
            filename: session.filename.clone(),
            status: TransferStatus::Started,
        };

        HandlerResult::reply(
            MessageType::ServerNotice,
            &ServerNotice::new(format!("Starting transfer of '{}'.", notice.filename)),
        )?
        .and_broadcast(MessageType::FileInfo, &notice)
    }
}
