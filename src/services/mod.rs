// src/services/mod.rs
pub mod prompt;
pub mod rag_pipeline;
pub mod relay;
pub mod upstream;

pub use rag_pipeline::{PipelineSettings, RagPipeline};
pub use relay::{Relay, RelayOutcome, RelayReport};
pub use upstream::{ChunkStream, CompletionService, EmbeddingService, VectorIndex};
