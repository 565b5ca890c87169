//! Shared stubs for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use futures::StreamExt;
use professor_chat::config::AppConfig;
use professor_chat::error::UpstreamError;
use professor_chat::models::{ChatMessage, CompletionChunk, RetrievalMatch};
use professor_chat::services::{
    ChunkStream, CompletionService, EmbeddingService, PipelineSettings, RagPipeline, VectorIndex,
};
use professor_chat::AppState;

/// One scripted item of a completion stream.
#[derive(Clone)]
pub enum Step {
    Text(&'static str),
    Fail(&'static str),
}

#[derive(Default)]
pub struct Recorded {
    pub embedded: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<u32>>,
    pub completions: Mutex<Vec<Vec<ChatMessage>>>,
}

impl Recorded {
    pub fn total_calls(&self) -> usize {
        self.embedded.lock().unwrap().len()
            + self.queries.lock().unwrap().len()
            + self.completions.lock().unwrap().len()
    }
}

pub struct Stub {
    pub recorded: Arc<Recorded>,
    pub matches: Vec<RetrievalMatch>,
    pub script: Vec<Step>,
    pub fail_embedding: bool,
}

#[async_trait]
impl EmbeddingService for Stub {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError> {
        self.recorded.embedded.lock().unwrap().push(text.to_string());
        if self.fail_embedding {
            return Err(UpstreamError::malformed("embeddings", "no embedding returned"));
        }
        Ok(vec![0.25; 8])
    }
}

#[async_trait]
impl VectorIndex for Stub {
    async fn query(&self, _vector: Vec<f32>, top_k: u32) -> Result<Vec<RetrievalMatch>, UpstreamError> {
        self.recorded.queries.lock().unwrap().push(top_k);
        Ok(self.matches.clone())
    }
}

#[async_trait]
impl CompletionService for Stub {
    async fn stream_chat(&self, _model: &str, messages: Vec<ChatMessage>) -> Result<ChunkStream, UpstreamError> {
        self.recorded.completions.lock().unwrap().push(messages);
        let items: Vec<Result<CompletionChunk, UpstreamError>> = self
            .script
            .iter()
            .map(|step| match step {
                Step::Text(text) => Ok(CompletionChunk::text(*text)),
                Step::Fail(detail) => Err(UpstreamError::stream("chat completions", *detail)),
            })
            .collect();
        Ok(futures::stream::iter(items).boxed())
    }
}

pub fn professor(id: &str, review: &str, subject: &str, stars: f64) -> RetrievalMatch {
    RetrievalMatch {
        id: id.into(),
        review: review.into(),
        subject: subject.into(),
        stars,
    }
}

pub fn config(with_openai_key: bool) -> AppConfig {
    AppConfig::from_lookup(|name| match name {
        "OPENAI_API_KEY" if with_openai_key => Some("sk-test".to_string()),
        "PINECONE_API_KEY" => Some("pc-test".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn state_with(stub: Stub, with_openai_key: bool) -> Arc<AppState> {
    let config = config(with_openai_key);
    let stub = Arc::new(stub);
    let pipeline = RagPipeline::new(PipelineSettings::from(&config), stub.clone(), stub.clone(), stub);
    Arc::new(AppState { config, pipeline })
}

pub fn stub(matches: Vec<RetrievalMatch>, script: Vec<Step>) -> (Stub, Arc<Recorded>) {
    let recorded = Arc::new(Recorded::default());
    (
        Stub {
            recorded: recorded.clone(),
            matches,
            script,
            fail_embedding: false,
        },
        recorded,
    )
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
