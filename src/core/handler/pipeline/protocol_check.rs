// src/core/handler/pipeline/protocol_check.rs

//! Pipeline step rejecting message types a client is not allowed to send.

use crate::core::ChatError;
use crate::core::protocol::MessageType;

/// Resolves a raw code and checks it against the client allow-list.
pub fn check_client_message_type(code: u16) -> Result<MessageType, ChatError> {
    let msg_type = MessageType::try_from(code)?;
    if !msg_type.is_client_originated() {
        return Err(ChatError::ProtocolViolation(msg_type));
    }
    Ok(msg_type)
}
