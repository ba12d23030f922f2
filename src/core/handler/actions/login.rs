// src/core/handler/actions/login.rs

use crate::core::handler::{HandlerContext, HandlerResult, MessageHandler};
use crate::core::protocol::MessageType;
use crate::core::protocol::payloads::{self, LoginRequest, LoginResponse, UserNotice};
use crate::core::{ChatError, ConnectionId, metrics};
use async_trait::async_trait;
use bytes::Bytes;

/// Handles `UserLoginRequest`: claims a nickname and announces the new user.
pub struct LoginHandler;

#[async_trait]
impl MessageHandler for LoginHandler {
    fn message_type(&self) -> MessageType {
        MessageType::UserLoginRequest
    }

    async fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        id: ConnectionId,
        payload: Bytes,
    ) -> Result<HandlerResult, ChatError> {
        let request: LoginRequest = payloads::decode(&payload)?;
        let nickname = request.nickname.trim();
        if nickname.is_empty() {
            return Err(ChatError::InvalidNickname);
        }

        ctx.sessions.login(id, nickname)?;
        metrics::AUTHENTICATED_USERS.set(ctx.sessions.authenticated_count() as f64);

        HandlerResult::reply(
            MessageType::UserLoginResponse,
            &LoginResponse::success(nickname, id),
        )?
        .and_broadcast(
            MessageType::UserJoinNotice,
            &UserNotice {
                nickname: nickname.to_string(),
            },
        )
    }
}
