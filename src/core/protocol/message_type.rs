// src/core/protocol/message_type.rs

//! The numeric message type namespace shared with every client.

use crate::core::ChatError;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Every message type known to the protocol, with its interop code.
///
/// The codes are part of the wire contract and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum MessageType {
    ChatText = 1,

    FileInfo = 10,
    FileChunk = 11,
    FileEnd = 12,
    FileRequest = 13,

    UserLoginRequest = 100,
    UserLoginResponse = 101,

    UserJoinNotice = 200,
    UserLeaveNotice = 201,
    ServerNotice = 202,

    ErrorResponse = 500,

    Ping = 900,
    Pong = 901,
}

/// The message types a client is allowed to originate.
pub const CLIENT_MESSAGE_TYPES: [MessageType; 5] = [
    MessageType::UserLoginRequest,
    MessageType::ChatText,
    MessageType::FileInfo,
    MessageType::FileChunk,
    MessageType::FileEnd,
];

impl MessageType {
    /// The full protocol code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Resolves a full protocol code.
    pub fn from_code(code: u16) -> Option<Self> {
        let msg_type = match code {
            1 => MessageType::ChatText,
            10 => MessageType::FileInfo,
            11 => MessageType::FileChunk,
            12 => MessageType::FileEnd,
            13 => MessageType::FileRequest,
            100 => MessageType::UserLoginRequest,
            101 => MessageType::UserLoginResponse,
            200 => MessageType::UserJoinNotice,
            201 => MessageType::UserLeaveNotice,
            202 => MessageType::ServerNotice,
            500 => MessageType::ErrorResponse,
            900 => MessageType::Ping,
            901 => MessageType::Pong,
            _ => return None,
        };
        Some(msg_type)
    }

    /// The one-byte tag used in a frame header: the low byte of the code.
    ///
    /// `ErrorResponse` travels as 244, `Ping` as 132 and `Pong` as 133.
    pub fn wire_tag(self) -> u8 {
        (self.code() & 0xFF) as u8
    }

    /// Expands a frame header tag back to the full protocol code.
    ///
    /// Tags that belong to no known type are passed through unchanged so the
    /// dispatcher can report them.
    pub fn code_for_wire_tag(tag: u8) -> u16 {
        match tag {
            244 => MessageType::ErrorResponse.code(),
            132 => MessageType::Ping.code(),
            133 => MessageType::Pong.code(),
            other => other as u16,
        }
    }

    /// Resolves a frame header tag back to its message type.
    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        Self::from_code(Self::code_for_wire_tag(tag))
    }

    /// True if a client may send this type to the server.
    pub fn is_client_originated(self) -> bool {
        CLIENT_MESSAGE_TYPES.contains(&self)
    }

    /// True if the payload is raw bytes rather than JSON.
    pub fn is_raw_payload(self) -> bool {
        matches!(self, MessageType::FileChunk)
    }
}

impl TryFrom<u16> for MessageType {
    type Error = ChatError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(ChatError::UnknownMessageType(code))
    }
}

impl From<MessageType> for u16 {
    fn from(msg_type: MessageType) -> Self {
        msg_type.code()
    }
}
