// src/core/protocol/payloads.rs

//! JSON bodies carried by every message type except `FileChunk`.
//!
//! Field names are camelCase on the wire so existing clients keep working.

use crate::core::{ChatError, ConnectionId};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Status carried by file broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Started,
    Completed,
    Failed,
}

// --- Client requests ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTextRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStartRequest {
    pub filename: String,
    pub filesize: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEndRequest {
    pub filename: String,
    pub checksum: String,
}

// --- Server responses and broadcasts ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub nickname: Option<String>,
    pub client_id: i64,
}

impl LoginResponse {
    pub fn success(nickname: impl Into<String>, client_id: ConnectionId) -> Self {
        Self {
            success: true,
            message: "success".to_string(),
            nickname: Some(nickname.into()),
            client_id: client_id as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNotice {
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTextBroadcast {
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTextBroadcast {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Body of `FileInfo` broadcasts and `FileEnd` replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStatusNotice {
    pub nickname: String,
    pub filename: String,
    pub status: TransferStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerNotice {
    pub message: String,
}

impl ServerNotice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatError> for ErrorResponse {
    fn from(e: &ChatError) -> Self {
        Self {
            error_code: e.code().to_string(),
            message: e.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Body accepted by the admin HTTP endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminMessage {
    pub message: String,
}

/// Parses a JSON payload into a request type.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ChatError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Serializes a body into an outbound payload.
pub fn encode<T: Serialize>(body: &T) -> Result<Bytes, ChatError> {
    Ok(Bytes::from(serde_json::to_vec(body)?))
}
