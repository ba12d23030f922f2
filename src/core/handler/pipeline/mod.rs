// src/core/handler/pipeline/mod.rs

//! Contains individual, reusable checks applied before or inside handlers.

pub mod auth_check;
pub mod protocol_check;
