//! HTTP request handlers

use super::auth::{session_token, AuthUser, SESSION_COOKIE};
use super::relay::{stream_response, to_backend_messages};
use super::types::{AppError, ChatRequest, HealthResponse, SignInResponse, SuccessResponse};
use super::AppState;
use crate::upstream::{UpstreamChatRequest, UpstreamError, UserProfile};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Chat relay
        .route("/api/chat", post(relay_chat))
        // Session lifecycle
        .route("/api/auth/sign-out", post(sign_out))
        // Health and version
        .route("/health", get(health))
        .route("/version", get(get_version));

    if state.dev_auth {
        tracing::warn!("Development sign-in enabled at /api/auth/dev-sign-in");
        router = router.route("/api/auth/dev-sign-in", post(dev_sign_in));
    }

    router.with_state(state)
}

// ============================================================
// Chat Relay
// ============================================================

async fn relay_chat(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let messages = to_backend_messages(&req.messages);
    tracing::debug!(
        user_id = %user.id,
        conversation_id = ?req.conversation_id,
        count = messages.len(),
        roles = ?messages.iter().map(|m| m.role.as_str()).collect::<Vec<_>>(),
        "Transformed messages"
    );

    let request = UpstreamChatRequest {
        messages,
        user_id: user.id,
        conversation_id: req.conversation_id,
    };

    match state.upstream.chat(&request).await {
        Ok(body) => {
            tracing::info!(
                user_id = %request.user_id,
                conversation_id = ?request.conversation_id,
                "Backend response OK, streaming"
            );
            stream_response(body)
        }
        Err(UpstreamError::Status { status, body }) => {
            tracing::error!(status, body = %body, "Backend error");
            Err(AppError::Internal)
        }
        Err(e) => {
            tracing::error!(error = %e, "Chat relay error");
            Err(AppError::Internal)
        }
    }
}

// ============================================================
// Sign-in / Sign-out
// ============================================================

/// Sign in with an unverified profile. Only mounted in development.
async fn dev_sign_in(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Response, AppError> {
    if profile.google_id.trim().is_empty() || profile.email.trim().is_empty() {
        return Err(AppError::BadRequest(
            "google_id and email are required".to_string(),
        ));
    }

    let user_id = profile.google_id.clone();
    let token = state.sessions.sign_in(profile, state.upstream.as_ref()).await;
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SignInResponse { token, user_id }),
    )
        .into_response())
}

async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SuccessResponse> {
    let success = match session_token(&headers) {
        Some(token) => state.sessions.sign_out(&token).await,
        None => false,
    };
    Json(SuccessResponse { success })
}

// ============================================================
// Health and Version
// ============================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_version() -> &'static str {
    concat!("adk-chat ", env!("CARGO_PKG_VERSION"))
}
