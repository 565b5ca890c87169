// src/services/relay.rs
//! Turns a completion chunk stream into a plain-text HTTP body.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use futures::{Stream, StreamExt};

use crate::error::UpstreamError;
use crate::services::upstream::ChunkStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The source ran out normally.
    Completed,
    /// The source raised an error, which was forwarded to the consumer.
    Failed,
    /// The consumer went away before the source was exhausted.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub outcome: RelayOutcome,
    pub fragments: usize,
    pub bytes: usize,
}

type ReleaseHook = Box<dyn FnOnce(RelayReport) + Send>;

/// Forwards non-empty chunk content as bytes, in arrival order, one fragment
/// per upstream chunk. The release hook runs exactly once, whichever way the
/// relay ends.
pub struct Relay {
    source: ChunkStream,
    release: Option<ReleaseHook>,
    fragments: usize,
    bytes: usize,
}

impl Relay {
    pub fn new(source: ChunkStream) -> Self {
        Self::with_release(source, log_release)
    }

    pub fn with_release<F>(source: ChunkStream, release: F) -> Self
    where
        F: FnOnce(RelayReport) + Send + 'static,
    {
        Self {
            source,
            release: Some(Box::new(release)),
            fragments: 0,
            bytes: 0,
        }
    }

    fn finish(&mut self, outcome: RelayOutcome) {
        if let Some(release) = self.release.take() {
            release(RelayReport {
                outcome,
                fragments: self.fragments,
                bytes: self.bytes,
            });
        }
    }

    /// 200 response streaming the relay as chunked UTF-8 text.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from_stream(self));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        response
    }
}

impl Stream for Relay {
    type Item = Result<Bytes, UpstreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.release.is_none() {
            return Poll::Ready(None);
        }

        loop {
            match ready!(this.source.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    // Role-only and finish-only chunks carry no text.
                    if let Some(text) = chunk.into_content() {
                        this.fragments += 1;
                        this.bytes += text.len();
                        return Poll::Ready(Some(Ok(Bytes::from(text))));
                    }
                }
                Some(Err(err)) => {
                    this.finish(RelayOutcome::Failed);
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    this.finish(RelayOutcome::Completed);
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.finish(RelayOutcome::Dropped);
    }
}

fn log_release(report: RelayReport) {
    match report.outcome {
        RelayOutcome::Completed => tracing::info!(
            fragments = report.fragments,
            bytes = report.bytes,
            "completion stream finished"
        ),
        RelayOutcome::Failed => tracing::error!(
            fragments = report.fragments,
            bytes = report.bytes,
            "completion stream failed mid-response"
        ),
        RelayOutcome::Dropped => tracing::warn!(
            fragments = report.fragments,
            bytes = report.bytes,
            "client went away before completion stream finished"
        ),
    }
}
