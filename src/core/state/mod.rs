// src/core/state/mod.rs

//! State that spans multiple messages: logins and in-flight file uploads.
//! Both are owned by the dispatcher and mutated only from the event loop.

mod sessions;
mod transfers;

pub use sessions::{Session, SessionRegistry, is_valid_nickname};
pub use transfers::{CompletedTransfer, FileTransferManager, FileTransferSession, sanitize_filename};
