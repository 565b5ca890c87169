// lib.rs - Rate My Professor chat server
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openai_client;
pub mod pinecone_client;
pub mod services;

use axum::{extract::Extension, response::Json, routing::get, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::services::RagPipeline;

// AppState holds the startup configuration and the chat pipeline wired to its upstream clients
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: RagPipeline,
}

/// Full application router with middleware and shared state attached.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::ui::ui_routes())
        .merge(handlers::chat::chat_routes())
        .route("/api/status", get(api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

// API Status endpoint
async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = |configured: bool| if configured { "configured" } else { "not_configured" };

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "openai": status(state.config.generation_configured()),
            "pinecone": status(state.config.vector_index_configured()),
        },
        "models": {
            "embedding": state.config.openai.embedding_model,
            "chat": state.config.openai.chat_model,
        },
        "index": {
            "name": state.config.pinecone.index_name,
            "namespace": state.config.pinecone.namespace,
            "top_k": state.config.top_k,
        },
        "endpoints": {
            "chat": "/api/chat",
            "status": "/api/status",
            "ui": "/",
        }
    }))
}
