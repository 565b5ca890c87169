// src/openai_client.rs
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::config::{ApiKey, OpenAiSettings};
use crate::error::UpstreamError;
use crate::models::{ChatMessage, CompletionChunk};
use crate::services::upstream::{ChunkStream, CompletionService, EmbeddingService};

const EMBEDDINGS: &str = "embeddings";
const COMPLETIONS: &str = "chat completions";

/// Client for the OpenAI embeddings and chat completions endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<ApiKey>,
    base_url: String,
    embedding_model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

impl OpenAiClient {
    pub fn new(settings: &OpenAiSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            embedding_model: settings.embedding_model.clone(),
        }
    }

    fn authorized(&self, builder: RequestBuilder, service: &'static str) -> Result<RequestBuilder, UpstreamError> {
        match &self.api_key {
            Some(key) => Ok(builder.bearer_auth(key.expose())),
            None => Err(UpstreamError::NotConfigured { service }),
        }
    }
}

#[async_trait]
impl EmbeddingService for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.embedding_model,
            encoding_format: "float",
        };

        let response = self
            .authorized(self.client.post(format!("{}/embeddings", self.base_url)), EMBEDDINGS)?
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::request(EMBEDDINGS, e))?;

        if !response.status().is_success() {
            return Err(UpstreamError::from_response(EMBEDDINGS, response).await);
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::malformed(EMBEDDINGS, e.to_string()))?;

        let embedding = embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| UpstreamError::malformed(EMBEDDINGS, "no embedding returned"))?;

        tracing::debug!(dimensions = embedding.len(), "embedded question");
        Ok(embedding)
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn stream_chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<ChunkStream, UpstreamError> {
        let request = ChatCompletionRequest {
            model,
            messages: &messages,
            stream: true,
        };
        let builder = self
            .authorized(self.client.post(format!("{}/chat/completions", self.base_url)), COMPLETIONS)?
            .json(&request);

        let mut events =
            EventSource::new(builder).map_err(|e| UpstreamError::stream(COMPLETIONS, e.to_string()))?;

        // The event source connects lazily. Waiting for the open event makes
        // connection and status failures surface before the response starts.
        match events.next().await {
            Some(Ok(Event::Open)) => Ok(completion_chunks(events).boxed()),
            Some(Ok(Event::Message(message))) => match parse_chunk(&message.data) {
                None => {
                    events.close();
                    Ok(futures::stream::empty().boxed())
                }
                Some(Err(err)) => {
                    events.close();
                    Ok(futures::stream::once(async move { Err(err) }).boxed())
                }
                Some(Ok(first)) => Ok(futures::stream::once(async move { Ok(first) })
                    .chain(completion_chunks(events))
                    .boxed()),
            },
            Some(Err(err)) => {
                events.close();
                Err(describe_stream_error(err).await)
            }
            None => Err(UpstreamError::stream(COMPLETIONS, "stream closed before opening")),
        }
    }
}

/// `None` for the `[DONE]` sentinel.
fn parse_chunk(data: &str) -> Option<Result<CompletionChunk, UpstreamError>> {
    if data.trim() == "[DONE]" {
        return None;
    }
    Some(serde_json::from_str(data).map_err(|e| UpstreamError::malformed(COMPLETIONS, e.to_string())))
}

/// Chunks in arrival order until `[DONE]`, the end of the body, or the first
/// error. The event source is closed on every exit so it never reconnects.
fn completion_chunks(events: EventSource) -> impl Stream<Item = Result<CompletionChunk, UpstreamError>> + Send {
    futures::stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        loop {
            match events.next().await {
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(message))) => match parse_chunk(&message.data) {
                    None => {
                        events.close();
                        return None;
                    }
                    Some(Ok(chunk)) => return Some((Ok(chunk), Some(events))),
                    Some(Err(err)) => {
                        events.close();
                        return Some((Err(err), None));
                    }
                },
                Some(Err(EventSourceError::StreamEnded)) | None => {
                    events.close();
                    return None;
                }
                Some(Err(err)) => {
                    events.close();
                    return Some((Err(describe_stream_error(err).await), None));
                }
            }
        }
    })
}

async fn describe_stream_error(err: EventSourceError) -> UpstreamError {
    match err {
        EventSourceError::Transport(source) => UpstreamError::request(COMPLETIONS, source),
        EventSourceError::InvalidStatusCode(_, response) => {
            UpstreamError::from_response(COMPLETIONS, response).await
        }
        other => UpstreamError::stream(COMPLETIONS, other.to_string()),
    }
}
