//! Upstream error types

use thiserror::Error;

/// Failure talking to the upstream ADK service.
///
/// `Display` never includes the upstream response body; callers that need it
/// for diagnostics read it from the `Status` variant.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection failed or the request could not be sent
    #[error("Upstream unreachable: {0}")]
    Network(String),
    /// Non-success status, with the error body as read from upstream
    #[error("Upstream returned status {status}")]
    Status { status: u16, body: String },
    /// The response body broke off mid-stream
    #[error("Upstream stream interrupted: {0}")]
    Stream(String),
    /// The HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl UpstreamError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
