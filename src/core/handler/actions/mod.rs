// src/core/handler/actions/mod.rs

//! One handler per client-originated message type.

mod chat_text;
mod file_chunk;
mod file_end;
mod file_start;
mod login;

pub use chat_text::ChatTextHandler;
pub use file_chunk::FileChunkHandler;
pub use file_end::FileEndHandler;
pub use file_start::FileStartHandler;
pub use login::LoginHandler;
