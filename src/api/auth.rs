//! Caller authentication for the relay
//!
//! Sign-in itself is handled by an external identity provider. Once it has
//! verified a user, [`SessionRegistry::sign_in`] issues a session token and
//! syncs the profile upstream. Handlers take an [`AuthUser`] argument to
//! require a valid token.

use super::types::AppError;
use super::AppState;
use crate::upstream::{Upstream, UserProfile};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "session_token";

/// A signed-in caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Stable id from the identity provider
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl From<UserProfile> for AuthUser {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.google_id,
            email: profile.email,
            name: profile.name,
            image: profile.image,
        }
    }
}

/// Live session tokens
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, AuthUser>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a verified profile and return its session token.
    ///
    /// The profile is pushed upstream first; a failed sync is logged and does
    /// not block sign-in.
    pub async fn sign_in(&self, profile: UserProfile, upstream: &dyn Upstream) -> String {
        match upstream.sync_user(&profile).await {
            Ok(()) => tracing::info!(user_id = %profile.google_id, "User synced to database"),
            Err(e) => tracing::error!(
                user_id = %profile.google_id,
                status = ?e.status(),
                error = %e,
                "Failed to sync user to database"
            ),
        }

        let token = uuid::Uuid::new_v4().to_string();
        self.insert(token.clone(), AuthUser::from(profile)).await;
        token
    }

    pub async fn insert(&self, token: String, user: AuthUser) {
        self.sessions.write().await.insert(token, user);
    }

    pub async fn lookup(&self, token: &str) -> Option<AuthUser> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Drop a session. Returns whether it existed.
    pub async fn sign_out(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

/// Session token from `Authorization: Bearer` or the session cookie
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .find_map(|cookies| token_from_cookie_header(cookies, SESSION_COOKIE))
    })
}

fn token_from_cookie_header(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            tracing::debug!(path = %parts.uri.path(), "Request without session token");
            return Err(AppError::Unauthorized);
        };
        state.sessions.lookup(&token).await.ok_or_else(|| {
            tracing::debug!(path = %parts.uri.path(), "Unknown session token");
            AppError::Unauthorized
        })
    }
}
