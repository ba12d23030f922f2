// src/core/handler/result.rs

//! The value a handler returns: at most one reply to the sender and at most one
//! broadcast to everyone else.

use crate::core::ChatError;
use crate::core::protocol::MessageType;
use crate::core::protocol::payloads::{self, ErrorResponse};
use bytes::Bytes;
use serde::Serialize;

/// A typed, already-serialized outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub msg_type: MessageType,
    pub payload: Bytes,
}

impl Outbound {
    pub fn new(msg_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            payload: payload.into(),
        }
    }

    pub fn json<T: Serialize>(msg_type: MessageType, body: &T) -> Result<Self, ChatError> {
        Ok(Self::new(msg_type, payloads::encode(body)?))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandlerResult {
    direct: Option<Outbound>,
    broadcast: Option<Outbound>,
}

impl HandlerResult {
    /// Nothing to send.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A JSON reply to the originating connection.
    pub fn reply<T: Serialize>(msg_type: MessageType, body: &T) -> Result<Self, ChatError> {
        Ok(Self {
            direct: Some(Outbound::json(msg_type, body)?),
            broadcast: None,
        })
    }

    /// A JSON broadcast to every other connection.
    pub fn broadcast<T: Serialize>(msg_type: MessageType, body: &T) -> Result<Self, ChatError> {
        Ok(Self {
            direct: None,
            broadcast: Some(Outbound::json(msg_type, body)?),
        })
    }

    /// An `ErrorResponse` reply describing `err`.
    pub fn error(err: &ChatError) -> Self {
        let body = ErrorResponse::from(err);
        // ErrorResponse holds only strings and a timestamp; fall back to plain text anyway.
        let payload = payloads::encode(&body).unwrap_or_else(|_| Bytes::from(err.to_string()));
        Self {
            direct: Some(Outbound::new(MessageType::ErrorResponse, payload)),
            broadcast: None,
        }
    }

    /// Adds (or replaces) the broadcast part.
    pub fn and_broadcast<T: Serialize>(
        mut self,
        msg_type: MessageType,
        body: &T,
    ) -> Result<Self, ChatError> {
        self.broadcast = Some(Outbound::json(msg_type, body)?);
        Ok(self)
    }

    pub fn direct(&self) -> Option<&Outbound> {
        self.direct.as_ref()
    }

    pub fn broadcast_part(&self) -> Option<&Outbound> {
        self.broadcast.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_none() && self.broadcast.is_none()
    }

    /// Splits the result into its direct and broadcast parts.
    pub fn into_parts(self) -> (Option<Outbound>, Option<Outbound>) {
        (self.direct, self.broadcast)
    }
}
