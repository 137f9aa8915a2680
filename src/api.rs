//! HTTP API for the chat relay

pub mod auth;
mod handlers;
mod relay;
mod types;

pub use auth::{AuthUser, SessionRegistry};
pub use handlers::create_router;
pub use relay::to_backend_messages;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::config::RelayConfig;
use crate::upstream::{AdkClient, Upstream, UpstreamError};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
    pub sessions: Arc<SessionRegistry>,
    /// Mount the development sign-in route
    pub dev_auth: bool,
}

impl AppState {
    /// # Errors
    ///
    /// Fails when the upstream HTTP client cannot be built.
    pub fn new(config: &RelayConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            upstream: Arc::new(AdkClient::new(config)?),
            sessions: Arc::new(SessionRegistry::new()),
            dev_auth: config.dev_auth,
        })
    }
}
