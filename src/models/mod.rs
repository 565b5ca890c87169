// src/models/mod.rs
pub mod chat;
pub mod retrieval;

pub use chat::{ChatMessage, Role};
pub use retrieval::{CompletionChunk, RetrievalMatch};
