// src/core/handler/mod.rs

//! Turns validated inbound messages into outbound replies and broadcasts.

mod actions;
pub mod dispatcher;
mod handler_trait;
pub mod pipeline;
pub mod registry;
mod result;

pub use actions::{ChatTextHandler, FileChunkHandler, FileEndHandler, FileStartHandler, LoginHandler};
pub use dispatcher::Dispatcher;
pub use handler_trait::{HandlerContext, MessageHandler};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
pub use result::{HandlerResult, Outbound};
