// src/core/protocol/mod.rs

pub mod frame;
pub mod message_type;
pub mod payloads;

pub use frame::{FrameCodec, MessageFrame};
pub use message_type::MessageType;
