// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: frame decoding,
//! outbound writes, and cleanup when the socket goes away.

mod guard;
mod handler;

pub use guard::ConnectionGuard;
pub use handler::{ConnectionHandler, transport_error_code};
