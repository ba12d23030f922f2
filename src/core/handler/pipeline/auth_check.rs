// src/core/handler/pipeline/auth_check.rs

//! Pipeline step for handlers that only logged-in users may reach.

use crate::core::state::SessionRegistry;
use crate::core::{ChatError, ConnectionId};

/// Returns the sender's nickname, or `AuthRequired` if it has not logged in.
pub fn require_login(sessions: &SessionRegistry, id: ConnectionId) -> Result<String, ChatError> {
    sessions
        .nickname(id)
        .map(str::to_string)
        .ok_or(ChatError::AuthRequired)
}
