//! Upstream ADK service client
//!
//! The relay forwards chat turns here and streams the answer back; sign-in
//! pushes the user's profile here.

mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use error::UpstreamError;

use crate::config::RelayConfig;
use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

/// Streamed upstream response body
pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

/// One turn in the upstream wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub role: String,
    pub content: String,
}

/// Body of `POST {ADK_API_URL}/api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamChatRequest {
    pub messages: Vec<BackendMessage>,
    pub user_id: String,
    pub conversation_id: Option<String>,
}

/// Body of `POST {ADK_API_URL}/api/users/sync`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub google_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Interface to the upstream AI service
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send a chat turn; on success the body is returned unread
    ///
    /// # Errors
    ///
    /// [`UpstreamError::Status`] for a non-success status; [`UpstreamError::Network`] when the
    /// service is unreachable.
    async fn chat(&self, request: &UpstreamChatRequest) -> Result<ByteStream, UpstreamError>;

    /// Create or update the user record
    ///
    /// # Errors
    ///
    /// Fails like [`Upstream::chat`].
    async fn sync_user(&self, profile: &UserProfile) -> Result<(), UpstreamError>;
}

/// HTTP client for the ADK service
pub struct AdkClient {
    client: reqwest::Client,
    base_url: String,
}

impl AdkClient {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: &RelayConfig) -> Result<Self, UpstreamError> {
        // No overall timeout: it would cut off long streamed answers.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.adk_api_url.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Upstream for AdkClient {
    async fn chat(&self, request: &UpstreamChatRequest) -> Result<ByteStream, UpstreamError> {
        let response = self.post("/api/chat", request).await?;
        Ok(response
            .bytes_stream()
            .map_err(|e| UpstreamError::Stream(e.to_string()))
            .boxed())
    }

    async fn sync_user(&self, profile: &UserProfile) -> Result<(), UpstreamError> {
        self.post("/api/users/sync", profile).await?;
        Ok(())
    }
}
