// src/core/errors.rs

//! Defines the primary error type for the entire application.

use crate::core::protocol::MessageType;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the server.
///
/// The protocol variants are recoverable: the dispatcher turns each of them into a
/// single `ErrorResponse` sent back to the offending connection. The infrastructure
/// variants (`Io`, `Transport`, `DuplicateHandler`, ...) surface from the socket
/// engine, the file system or startup wiring.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid message type ({0}) sent from client")]
    ProtocolViolation(MessageType),

    #[error("Unknown message type code {0}")]
    UnknownMessageType(u16),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Authentication required. Log in first.")]
    AuthRequired,

    #[error("Nickname must be 3-15 ASCII letters or digits")]
    InvalidNickname,

    #[error("Nickname '{0}' is already in use")]
    NicknameTaken(String),

    #[error("Connection is already logged in")]
    AlreadyLoggedIn,

    #[error("Connection {0} is not registered")]
    NotConnected(u64),

    #[error("Invalid file name or size")]
    InvalidFileMetadata,

    #[error("No active file transfer. FILE_INFO must be sent first.")]
    NoActiveTransfer,

    #[error("Transfer exceeded declared size of {declared} bytes")]
    TransferOverflow { declared: u64 },

    #[error("Incomplete transfer: received {received} of {declared} bytes")]
    IncompleteTransfer { received: u64, declared: u64 },

    #[error("Checksum mismatch for '{0}'")]
    ChecksumMismatch(String),

    #[error("Payload of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),

    #[error("Handler for {0} registered twice")]
    DuplicateHandler(MessageType),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl ChatError {
    /// The short, machine-readable code carried in an `ErrorResponse`.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Io(_) => "IO_ERROR",
            ChatError::Transport(_) => "TRANSPORT_ERROR",
            ChatError::ProtocolViolation(_) => "PROTOCOL_VIOLATION",
            ChatError::UnknownMessageType(_) => "UNKNOWN_MESSAGE_TYPE",
            ChatError::MalformedPayload(_) => "INVALID_REQUEST_FORMAT",
            ChatError::AuthRequired => "AUTH_REQUIRED",
            ChatError::InvalidNickname => "INVALID_NICKNAME",
            ChatError::NicknameTaken(_) => "NICKNAME_TAKEN",
            ChatError::AlreadyLoggedIn => "ALREADY_LOGGED_IN",
            ChatError::NotConnected(_) => "NOT_CONNECTED",
            ChatError::InvalidFileMetadata => "INVALID_FILE_INFO",
            ChatError::NoActiveTransfer => "NO_ACTIVE_TRANSFER",
            ChatError::TransferOverflow { .. } => "TRANSFER_OVERFLOW",
            ChatError::IncompleteTransfer { .. } => "INCOMPLETE_TRANSFER",
            ChatError::ChecksumMismatch(_) => "CHECKSUM_MISMATCH",
            ChatError::FrameTooLarge(_) => "FRAME_TOO_LARGE",
            ChatError::DuplicateHandler(_) => "DUPLICATE_HANDLER",
            ChatError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures that end an in-flight file transfer after it was accepted.
    /// These are the failures other participants are told about.
    pub fn is_transfer_failure(&self) -> bool {
        matches!(
            self,
            ChatError::Io(_)
                | ChatError::TransferOverflow { .. }
                | ChatError::IncompleteTransfer { .. }
                | ChatError::ChecksumMismatch(_)
        )
    }
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for ChatError {
    fn clone(&self) -> Self {
        match self {
            ChatError::Io(e) => ChatError::Io(Arc::clone(e)),
            ChatError::Transport(s) => ChatError::Transport(s.clone()),
            ChatError::ProtocolViolation(t) => ChatError::ProtocolViolation(*t),
            ChatError::UnknownMessageType(c) => ChatError::UnknownMessageType(*c),
            ChatError::MalformedPayload(s) => ChatError::MalformedPayload(s.clone()),
            ChatError::AuthRequired => ChatError::AuthRequired,
            ChatError::InvalidNickname => ChatError::InvalidNickname,
            ChatError::NicknameTaken(s) => ChatError::NicknameTaken(s.clone()),
            ChatError::AlreadyLoggedIn => ChatError::AlreadyLoggedIn,
            ChatError::NotConnected(id) => ChatError::NotConnected(*id),
            ChatError::InvalidFileMetadata => ChatError::InvalidFileMetadata,
            ChatError::NoActiveTransfer => ChatError::NoActiveTransfer,
            ChatError::TransferOverflow { declared } => ChatError::TransferOverflow {
                declared: *declared,
            },
            ChatError::IncompleteTransfer { received, declared } => {
                ChatError::IncompleteTransfer {
                    received: *received,
                    declared: *declared,
                }
            }
            ChatError::ChecksumMismatch(s) => ChatError::ChecksumMismatch(s.clone()),
            ChatError::FrameTooLarge(n) => ChatError::FrameTooLarge(*n),
            ChatError::DuplicateHandler(t) => ChatError::DuplicateHandler(*t),
            ChatError::Internal(s) => ChatError::Internal(s.clone()),
        }
    }
}

impl PartialEq for ChatError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ChatError::Io(e1), ChatError::Io(e2)) => e1.to_string() == e2.to_string(),
            (ChatError::Transport(s1), ChatError::Transport(s2)) => s1 == s2,
            (ChatError::ProtocolViolation(t1), ChatError::ProtocolViolation(t2)) => t1 == t2,
            (ChatError::UnknownMessageType(c1), ChatError::UnknownMessageType(c2)) => c1 == c2,
            (ChatError::MalformedPayload(s1), ChatError::MalformedPayload(s2)) => s1 == s2,
            (ChatError::NicknameTaken(s1), ChatError::NicknameTaken(s2)) => s1 == s2,
            (ChatError::NotConnected(i1), ChatError::NotConnected(i2)) => i1 == i2,
            (
                ChatError::TransferOverflow { declared: d1 },
                ChatError::TransferOverflow { declared: d2 },
            ) => d1 == d2,
            (
                ChatError::IncompleteTransfer {
                    received: r1,
                    declared: d1,
                },
                ChatError::IncompleteTransfer {
                    received: r2,
                    declared: d2,
                },
            ) => r1 == r2 && d1 == d2,
            (ChatError::ChecksumMismatch(s1), ChatError::ChecksumMismatch(s2)) => s1 == s2,
            (ChatError::FrameTooLarge(n1), ChatError::FrameTooLarge(n2)) => n1 == n2,
            (ChatError::DuplicateHandler(t1), ChatError::DuplicateHandler(t2)) => t1 == t2,
            (ChatError::Internal(s1), ChatError::Internal(s2)) => s1 == s2,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ChatError {
    fn from(e: std::io::Error) -> Self {
        ChatError::Io(Arc::new(e))
    }
}

impl From<std::str::Utf8Error> for ChatError {
    fn from(e: std::str::Utf8Error) -> Self {
        ChatError::MalformedPayload(format!("payload is not valid UTF-8: {e}"))
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::MalformedPayload(e.to_string())
    }
}
