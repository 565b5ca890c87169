// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure of one of the third-party services the chat pipeline calls.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} credential is not configured")]
    NotConfigured { service: &'static str },

    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{service} sent a malformed response: {detail}")]
    Malformed { service: &'static str, detail: String },

    #[error("{service} stream failed: {detail}")]
    Stream { service: &'static str, detail: String },
}

impl UpstreamError {
    pub fn request(service: &'static str, source: reqwest::Error) -> Self {
        Self::Request { service, source }
    }

    pub fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            detail: detail.into(),
        }
    }

    pub fn stream(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Stream {
            service,
            detail: detail.into(),
        }
    }

    /// Reads the body of a non-success response into a `Status` error.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::Status { service, status, body }
    }
}

/// Errors surfaced by the chat endpoint before its stream starts.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error("{0}")]
    InvalidConversation(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match self {
            ChatError::MissingCredential(_) => {
                tracing::error!(error = %self, "chat request rejected");
                let body = ErrorBody { error: self.to_string() };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ChatError::InvalidConversation(_) => {
                tracing::warn!(error = %self, "chat request rejected");
                let body = ErrorBody { error: self.to_string() };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ChatError::Upstream(err) => {
                // Upstream details stay in the logs; the client gets a bare 500.
                tracing::error!(error = %err, "upstream service failed before streaming");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
