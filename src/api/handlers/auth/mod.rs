//! Same-origin auth facade for the dashboard.
//!
//! Every request builds a `SessionController` over a `CookieTokenStore`
//! seeded from the request cookies. Whatever the controller changes in the
//! store is written back as `Set-Cookie` headers, so the browser holds the
//! credential pair and page scripts never see the refresh token.
//!
//! ## Endpoints
//!
//! - `POST /api/auth/request-otp`: send a one-time code.
//! - `POST /api/auth/login`: exchange the code for cookies and the user.
//! - `POST /api/auth/logout`: revoke upstream (bounded) and always clear cookies.
//! - `GET /api/auth/check`: offline expiry check of the access cookie.
//! - `GET /api/auth/token`: hand the access token to same-origin callers.
//! - `GET /api/auth/session`: resolve cookies into the current user, refreshing once.

pub(crate) mod otp;
pub(crate) mod session;
mod state;
pub(crate) mod types;

pub use state::AuthState;

use crate::session::CookieTokenStore;
use axum::{
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
};

/// Appends the store's pending cookie changes to `response`.
fn with_cookies(store: &CookieTokenStore, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    for cookie in store.set_cookie_headers() {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

#[cfg(test)]
mod tests;
