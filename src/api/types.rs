//! API request and response types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// A message as sent by the chat client.
///
/// Newer clients send `parts`; older ones send a flat `content` string.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    #[allow(dead_code)] // Parsed for completeness, not forwarded
    pub id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub parts: Option<Vec<InboundPart>>,
    #[serde(default)]
    pub content: Option<String>,
}

/// One part of an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundPart {
    Text {
        #[serde(default)]
        text: String,
    },
    File {
        #[serde(rename = "mediaType", default)]
        media_type: String,
        #[serde(default)]
        data: String,
    },
    /// Any part type this relay does not know about
    #[serde(other)]
    Other,
}

/// Response for sign-in
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub user_id: String,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Handler errors. `Internal` carries no detail.
#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    BadRequest(String),
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
