// src/core/protocol/frame.rs

//! Implements the binary frame used on the client socket and the corresponding
//! `Encoder` and `Decoder` for network communication.
//!
//! A frame is a 1-byte type tag, a 4-byte big-endian payload length and the payload.
//! The tag is the low byte of the message code; see [`MessageType::wire_tag`].

use crate::core::ChatError;
use crate::core::protocol::MessageType;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Size of the fixed frame header: type tag plus length.
pub const HEADER_LEN: usize = 5;

/// Default upper bound on a single payload (16 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// A single framed message exchanged with a client.
///
/// The code is kept raw so that frames with unknown types still reach the
/// dispatcher, which answers them with an error.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageFrame {
    pub code: u16,
    pub payload: Bytes,
}

impl MessageFrame {
    pub fn new(msg_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            code: msg_type.code(),
            payload: payload.into(),
        }
    }

    /// The known message type for this frame, if any.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_code(self.code)
    }

    /// Encodes the frame into a fresh byte vector.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, ChatError> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        FrameCodec::default().encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }
}

/// A `tokio_util::codec` implementation for `MessageFrame`s.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload: usize,
}

impl FrameCodec {
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Encoder<MessageFrame> for FrameCodec {
    type Error = ChatError;

    fn encode(&mut self, item: MessageFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = item.payload.len();
        if len > self.max_payload || len > u32::MAX as usize {
            return Err(ChatError::FrameTooLarge(len));
        }
        dst.reserve(HEADER_LEN + len);
        dst.put_u8((item.code & 0xFF) as u8);
        dst.put_u32(len as u32);
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = MessageFrame;
    type Error = ChatError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let tag = src[0];
        let len = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;

        // Reject oversized frames from the header alone, before buffering the body.
        if len > self.max_payload {
            return Err(ChatError::FrameTooLarge(len));
        }

        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(len).freeze();
        Ok(Some(MessageFrame {
            code: MessageType::code_for_wire_tag(tag),
            payload,
        }))
    }
}
