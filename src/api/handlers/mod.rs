pub mod auth;
pub mod health;

use axum::{http::StatusCode, response::Response};

// Fallback when no dashboard directory is configured.
pub async fn not_found() -> Response {
    auth::types::ErrorResponse::with_status(StatusCode::NOT_FOUND, "Not found")
}
