// src/core/handler/registry.rs

//! The dispatch table from message type to handler, built once at startup.

use super::actions::{
    ChatTextHandler, FileChunkHandler, FileEndHandler, FileStartHandler, LoginHandler,
};
use super::handler_trait::MessageHandler;
use crate::core::ChatError;
use crate::core::protocol::MessageType;
use std::collections::HashMap;
use tracing::info;

/// A read-only map of registered handlers.
pub struct HandlerRegistry {
    handlers: HashMap<MessageType, Box<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// The registry with every built-in handler.
    pub fn with_default_handlers() -> Result<Self, ChatError> {
        let registry = Self::builder()
            .register(LoginHandler)?
            .register(ChatTextHandler)?
            .register(FileStartHandler)?
            .register(FileChunkHandler)?
            .register(FileEndHandler)?
            .build();
        Ok(registry)
    }

    pub fn get(&self, msg_type: MessageType) -> Option<&dyn MessageHandler> {
        self.handlers.get(&msg_type).map(|h| h.as_ref())
    }

    pub fn contains(&self, msg_type: MessageType) -> bool {
        self.handlers.contains_key(&msg_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered types, sorted by code.
    pub fn message_types(&self) -> Vec<MessageType> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<MessageType, Box<dyn MessageHandler>>,
}

impl HandlerRegistryBuilder {
    /// Adds a handler. Registering two handlers for one type is an error.
    pub fn register<H: MessageHandler + 'static>(mut self, handler: H) -> Result<Self, ChatError> {
        let msg_type = handler.message_type();
        if self.handlers.contains_key(&msg_type) {
            return Err(ChatError::DuplicateHandler(msg_type));
        }
        self.handlers.insert(msg_type, Box::new(handler));
        Ok(self)
    }

    pub fn build(self) -> HandlerRegistry {
        let registry = HandlerRegistry {
            handlers: self.handlers,
        };
        info!(
            "{} message handlers registered: {:?}",
            registry.len(),
            registry.message_types()
        );
        registry
    }
}
