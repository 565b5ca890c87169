// src/handlers/chat.rs
use crate::error::ChatError;
use crate::models::ChatMessage;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    response::Response,
    routing::post,
    Router,
};
use std::sync::Arc;

pub fn chat_routes() -> Router {
    Router::new().route("/api/chat", post(chat_handler))
}

/// Streams an answer to the newest user message in the posted transcript.
async fn chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Vec<ChatMessage>>, JsonRejection>,
) -> Result<Response, ChatError> {
    // A missing key is reported even when the body is unusable
    state.pipeline.ensure_configured()?;

    let Json(conversation) =
        payload.map_err(|rejection| ChatError::InvalidConversation(rejection.body_text()))?;

    tracing::info!(turns = conversation.len(), "💬 chat request");
    let relay = state.pipeline.respond(conversation).await?;
    Ok(relay.into_response())
}
