//! OTP request and verification endpoints.

use super::{
    state::AuthState,
    types::{ErrorResponse, LoginRequest, MessageResponse, RequestOtpRequest, UserResponse},
    with_cookies,
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    post,
    path = "/api/auth/request-otp",
    request_body = RequestOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = MessageResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 503, description = "Backend unreachable", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn request_otp(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<RequestOtpRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return invalid_body();
    };

    let (_store, controller) = auth_state.session(&headers);
    match controller.request_otp(&request.email).await {
        Ok(message) => (StatusCode::OK, Json(MessageResponse { message })).into_response(),
        Err(err) => {
            debug!("OTP request failed: {err}");
            err.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; token cookies set", body = UserResponse),
        (status = 400, description = "Missing email or OTP", body = ErrorResponse),
        (status = 401, description = "Invalid OTP", body = ErrorResponse),
        (status = 403, description = "Role cannot use the dashboard", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return invalid_body();
    };

    let (store, controller) = auth_state.session(&headers);
    match controller.login(&request.email, &request.otp).await {
        Ok(user) => with_cookies(&store, (StatusCode::OK, Json(UserResponse { user }))),
        Err(err) => {
            debug!("Login failed: {err}");
            err.into_response()
        }
    }
}

fn invalid_body() -> Response {
    ErrorResponse::with_status(StatusCode::BAD_REQUEST, "Invalid request body")
}
