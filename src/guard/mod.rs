//! Request-time gate for dashboard navigation.
//!
//! The check is presence-only: a protected request passes when the access
//! token cookie exists, expired or not. Validation happens later when the UI
//! initializes its session and on every backend call.

mod policy;

pub use policy::{RouteClass, RoutePolicy};

use crate::session::cookies::{read_cookie, ACCESS_TOKEN_COOKIE};
use axum::{
    extract::{Request, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;
use url::form_urlencoded;

pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

#[derive(Clone, Debug)]
pub struct RouteGuard {
    policy: RoutePolicy,
    login_path: String,
    cookie_name: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(RoutePolicy::default())
    }
}

impl RouteGuard {
    /// The login path is always public so the redirect target can render.
    #[must_use]
    pub fn new(policy: RoutePolicy) -> Self {
        Self {
            policy: policy.with_public(DEFAULT_LOGIN_PATH),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            cookie_name: ACCESS_TOKEN_COOKIE.to_string(),
        }
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: &str) -> Self {
        let login_path = format!("/{}", login_path.trim().trim_matches('/'));
        self.policy = self.policy.with_public(&login_path);
        self.login_path = login_path;
        self
    }

    #[must_use]
    pub fn with_cookie_name(mut self, cookie_name: &str) -> Self {
        self.cookie_name = cookie_name.to_string();
        self
    }

    #[must_use]
    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Decides a single navigation. `path_and_query` is the original request
    /// target, kept in the redirect so login can return to it.
    #[must_use]
    pub fn decide(&self, path: &str, path_and_query: &str, has_session: bool) -> GuardDecision {
        if has_session || self.policy.classify(path) == RouteClass::Public {
            return GuardDecision::Allow;
        }
        let target: String = form_urlencoded::byte_serialize(path_and_query.as_bytes()).collect();
        GuardDecision::Redirect(format!("{}?redirect={target}", self.login_path))
    }

    fn has_session(&self, headers: &HeaderMap) -> bool {
        read_cookie(headers, &self.cookie_name).is_some()
    }
}

/// axum middleware enforcing the guard before any handler runs.
pub async fn require_session(
    State(guard): State<Arc<RouteGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |value| value.as_str().to_string());

    match guard.decide(&path, &path_and_query, guard.has_session(request.headers())) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(location) => {
            debug!("Redirecting anonymous request for {path} to login");
            match HeaderValue::from_str(&location) {
                Ok(location) => (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, location)]).into_response(),
                Err(_) => StatusCode::UNAUTHORIZED.into_response(),
            }
        }
    }
}
