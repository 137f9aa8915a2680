//! Chat relay: reshape client messages for upstream and pass the stream back
//!
//! Only text survives the hop. File parts (images, audio) are dropped here;
//! the upstream chat endpoint takes plain `{role, content}` turns.

use super::types::{AppError, InboundMessage, InboundPart};
use crate::upstream::{BackendMessage, ByteStream};
use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
};

/// Marks the body as an AI SDK data stream
pub const DATA_STREAM_HEADER: HeaderName = HeaderName::from_static("x-vercel-ai-data-stream");
/// Asks nginx-style proxies not to buffer
pub const ACCEL_BUFFERING_HEADER: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Convert client messages to upstream turns, preserving order and role
#[must_use]
pub fn to_backend_messages(messages: &[InboundMessage]) -> Vec<BackendMessage> {
    messages.iter().map(to_backend_message).collect()
}

fn to_backend_message(message: &InboundMessage) -> BackendMessage {
    let content = match message.parts.as_deref() {
        Some(parts) if !parts.is_empty() => text_content(parts),
        _ => message.content.clone().unwrap_or_default(),
    };

    BackendMessage {
        role: message.role.clone(),
        content,
    }
}

/// Concatenate text parts in order, with no separator
fn text_content(parts: &[InboundPart]) -> String {
    let mut content = String::new();
    for part in parts {
        match part {
            InboundPart::Text { text } => content.push_str(text),
            InboundPart::File { media_type, data } => {
                tracing::debug!(
                    media_type = %media_type,
                    bytes = data.len(),
                    "Dropping file part from relayed message"
                );
            }
            InboundPart::Other => {}
        }
    }
    content
}

/// Wrap an upstream body as an unbuffered event-stream response
///
/// # Errors
///
/// Returns [`AppError`] if the streaming response cannot be built.
pub fn stream_response(body: ByteStream) -> Result<Response, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header(ACCEL_BUFFERING_HEADER, HeaderValue::from_static("no"))
        .header(DATA_STREAM_HEADER, HeaderValue::from_static("v1"))
        .body(Body::from_stream(body))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build stream response");
            AppError::Internal
        })
}
