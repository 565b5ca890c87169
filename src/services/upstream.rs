// src/services/upstream.rs
//! Seams between the chat pipeline and the third-party services it calls.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::UpstreamError;
use crate::models::{ChatMessage, CompletionChunk, RetrievalMatch};

pub type ChunkStream = BoxStream<'static, Result<CompletionChunk, UpstreamError>>;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest neighbours of `vector`, in the index's relevance order.
    async fn query(&self, vector: Vec<f32>, top_k: u32) -> Result<Vec<RetrievalMatch>, UpstreamError>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Opens a streamed completion. Connection and status failures are
    /// reported here; later failures arrive as stream items.
    async fn stream_chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<ChunkStream, UpstreamError>;
}
