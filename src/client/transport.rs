// src/client/transport.rs
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;

use crate::client::decoder::Utf8StreamDecoder;
use crate::client::store::{MessageStore, StoreEvent, ERROR_MESSAGE};
use crate::models::ChatMessage;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat endpoint returned {0}")]
    Status(reqwest::StatusCode),
}

/// Posts the whole transcript on every turn and streams the answer back into
/// the store.
#[derive(Debug, Clone)]
pub struct ChatTransport {
    client: Client,
    endpoint: String,
}

impl ChatTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Sends one user turn. `on_update` runs after every store change, which
    /// is once per received fragment while the answer streams in.
    ///
    /// Blank input is ignored. On failure the store already holds the
    /// apology message when the error is returned; nothing is retried.
    pub async fn send_turn<F>(
        &self,
        store: &mut MessageStore,
        text: &str,
        mut on_update: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&MessageStore),
    {
        if text.trim().is_empty() {
            return Ok(());
        }

        store.apply(StoreEvent::Append(ChatMessage::user(text)));
        on_update(store);

        match self.stream_answer(store, &mut on_update).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "chat turn failed");
                store.apply(StoreEvent::Append(ChatMessage::assistant(ERROR_MESSAGE)));
                on_update(store);
                Err(err)
            }
        }
    }

    async fn stream_answer<F>(&self, store: &mut MessageStore, on_update: &mut F) -> Result<(), TransportError>
    where
        F: FnMut(&MessageStore),
    {
        let response = self
            .client
            .post(&self.endpoint)
            .json(store.messages())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        let mut body = Box::pin(response.bytes_stream());
        let mut decoder = Utf8StreamDecoder::default();
        let mut answer = String::new();

        store.apply(StoreEvent::Append(ChatMessage::assistant("")));
        on_update(store);

        while let Some(fragment) = body.next().await {
            let fragment = fragment?;
            answer.push_str(&decoder.decode(&fragment));
            store.apply(StoreEvent::ReplaceLast(ChatMessage::assistant(answer.clone())));
            on_update(store);
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            answer.push_str(&tail);
            store.apply(StoreEvent::ReplaceLast(ChatMessage::assistant(answer)));
            on_update(store);
        }

        Ok(())
    }
}
