//! Session endpoints backed by the token cookies.

use super::{
    state::AuthState,
    types::{CheckResponse, ErrorResponse, LogoutResponse, TokenResponse, UserResponse},
    with_cookies,
};
use crate::session::{inspector, AuthError, SessionState, TokenStore};
use axum::{
    extract::Extension,
    http::{header::CACHE_CONTROL, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, warn};

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let (store, controller) = auth_state.session(&headers);
    // Cookies are cleared even when the backend call fails or times out.
    controller.logout().await;
    with_cookies(
        &store,
        (
            StatusCode::OK,
            Json(LogoutResponse {
                success: true,
                message: "Logged out successfully".to_string(),
            }),
        ),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/check",
    responses(
        (status = 200, description = "Access token present and unexpired", body = CheckResponse),
        (status = 401, description = "No access token, or it expired", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn check(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let store = auth_state.cookie_store(&headers);
    let Some(access_token) = store.access_token() else {
        return not_authenticated();
    };

    if inspector::is_expired(access_token.expose_secret()) {
        debug!("Access cookie expired");
        // The refresh cookie stays for a later session restore.
        store.clear_access_token();
        return with_cookies(
            &store,
            AuthError::Unauthenticated("Token expired".to_string()),
        );
    }

    (
        StatusCode::OK,
        Json(CheckResponse {
            authenticated: true,
            expires_at: inspector::expires_at(access_token.expose_secret()),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/token",
    responses(
        (status = 200, description = "Current access token", body = TokenResponse),
        (status = 401, description = "No access token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn token(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let store = auth_state.cookie_store(&headers);
    let Some(access_token) = store.access_token() else {
        return not_authenticated();
    };

    (
        StatusCode::OK,
        [(CACHE_CONTROL, "no-store")],
        Json(TokenResponse {
            access_token: access_token.expose_secret().to_string(),
            token_type: "Bearer".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session restored", body = UserResponse),
        (status = 401, description = "No usable session; cookies cleared", body = ErrorResponse),
        (status = 503, description = "Backend unreachable; cookies kept", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let (store, controller) = auth_state.session(&headers);
    let state = controller.initialize().await;
    let snapshot = controller.snapshot();

    match (state, snapshot.user) {
        (SessionState::Authenticated, Some(user)) => {
            with_cookies(&store, (StatusCode::OK, Json(UserResponse { user })))
        }
        _ => {
            if let Some(message) = snapshot.error {
                warn!("Session restore deferred: {message}");
                // A refresh may have rotated the pair before the failure.
                return with_cookies(
                    &store,
                    ErrorResponse::with_status(StatusCode::SERVICE_UNAVAILABLE, message),
                );
            }
            store.clear_tokens();
            with_cookies(&store, not_authenticated())
        }
    }
}

fn not_authenticated() -> Response {
    AuthError::Unauthenticated("Not authenticated".to_string()).into_response()
}
