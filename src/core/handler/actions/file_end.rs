// src/core/handler/actions/file_end.rs

use crate::core::handler::pipeline::auth_check;
use crate::core::handler::{HandlerContext, HandlerResult, MessageHandler};
use crate::core::protocol::MessageType;
use crate::core::protocol::payloads::{
    self, FileEndRequest, FileStatusNotice, ServerNotice, TransferStatus,
};
use crate::core::state::sanitize_filename;
use crate::core::{ChatError, ConnectionId, metrics};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

/// Handles `FileEnd`: verifies the upload and announces the result.
///
/// Failures of the transfer itself are also broadcast as a `FAILED` notice so
/// other participants stop waiting for the file.
pub struct FileEndHandler;

#[async_trait]
impl MessageHandler for FileEndHandler {
    fn message_type(&self) -> MessageType {
        MessageType::FileEnd
    }

    async fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        id: ConnectionId,
        payload: Bytes,
    ) -> Result<HandlerResult, ChatError> {
        let nickname = auth_check::require_login(ctx.sessions, id)?;
        let request: FileEndRequest = payloads::decode(&payload)?;

        match ctx.transfers.finish(id, &request.checksum).await {
            Ok(completed) => {
                metrics::TRANSFERS_COMPLETED_TOTAL.inc();
                info!(
                    connection_id = id,
                    filename = %completed.filename,
                    size = completed.size,
                    "File received."
                );
                let notice = ServerNotice::new(format!(
                    "[SYSTEM] {} shared '{}'.",
                    nickname, completed.filename
                ));
                HandlerResult::reply(
                    MessageType::FileEnd,
                    &FileStatusNotice {
                        nickname,
                        filename: completed.filename,
                        status: TransferStatus::Completed,
                    },
                )?
                .and_broadcast(MessageType::ServerNotice, &notice)
            }
            Err(e) if e.is_transfer_failure() => {
                metrics::TRANSFERS_FAILED_TOTAL.inc();
                warn!(connection_id = id, "File transfer failed: {}", e);
                HandlerResult::error(&e).and_broadcast(
                    MessageType::ErrorResponse,
                    &FileStatusNotice {
                        nickname,
                        filename: sanitize_filename(&request.filename),
                        status: TransferStatus::Failed,
                    },
                )
            }
            Err(e) => Err(e),
        }
    }
}
