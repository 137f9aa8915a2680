//! Client side of `POST /api/chat`

use super::state::Message;
use super::stream::{decode_stream, StreamPart};
use crate::config::ClientConfig;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body the session sends to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundChat {
    pub messages: Vec<Message>,
    pub conversation_id: Option<String>,
}

/// Decoded response stream
pub type PartStream = BoxStream<'static, Result<StreamPart, TransportError>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Relay returned {0}")]
    Status(u16),

    #[error("Stream interrupted: {0}")]
    Stream(String),
}

/// Carries a chat turn to the relay
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// # Errors
    ///
    /// Fails on a network error or a non-success response status.
    async fn send(&self, chat: &OutboundChat) -> Result<PartStream, TransportError>;
}

/// HTTP transport against a running relay
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", config.relay_url),
            token: config.token.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, chat: &OutboundChat) -> Result<PartStream, TransportError> {
        let mut request = self.client.post(&self.endpoint).json(chat);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TransportError::Unauthorized);
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes_stream()
            .map_err(|e| TransportError::Stream(e.to_string()));
        Ok(decode_stream(bytes).boxed())
    }
}
