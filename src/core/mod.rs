// src/core/mod.rs

//! The central module containing the protocol, session state and dispatch logic of chatrelay.

pub mod errors;
pub mod events;
pub mod gateway;
pub mod handler;
pub mod metrics;
pub mod protocol;
pub mod state;

/// Identifies one live connection. The socket engine may reuse an id after disconnect.
pub type ConnectionId = u64;

pub use errors::ChatError;
pub use gateway::{TransportCallbacks, TransportGateway};
pub use protocol::MessageType;
