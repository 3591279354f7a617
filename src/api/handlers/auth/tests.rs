//! Auth facade tests against a scripted backend.

use super::AuthState;
use crate::{
    api::router,
    session::{
        inspector::tests::token_expiring_at, inspector::unix_now, AuthApi, AuthError,
        CookieConfig, CredentialPair, LoginGrant, Role, SessionConfig, User,
    },
};
use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        Method, Request, StatusCode,
    },
    response::Response,
    Extension, Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tower::ServiceExt;

fn user(role: Role) -> User {
    User {
        id: "u1".to_string(),
        email: "teacher@school.edu".to_string(),
        name: Some("Ada".to_string()),
        role,
        is_verified: true,
        xp: None,
        streak: None,
    }
}

#[derive(Default)]
struct ScriptedApi {
    login: Option<Result<LoginGrant, AuthError>>,
    refresh: Option<Result<CredentialPair, AuthError>>,
    profile: Option<Result<User, AuthError>>,
    logout_fails: bool,
    logout_hangs: bool,
    logout_calls: AtomicUsize,
}

#[async_trait]
impl AuthApi for ScriptedApi {
    async fn request_otp(&self, _email: &str) -> Result<String, AuthError> {
        Ok("OTP sent to your email".to_string())
    }

    async fn login(&self, _email: &str, _otp: &str) -> Result<LoginGrant, AuthError> {
        self.login
            .clone()
            .unwrap_or_else(|| Err(AuthError::Network("unscripted".to_string())))
    }

    async fn refresh(&self, _refresh_token: &SecretString) -> Result<CredentialPair, AuthError> {
        self.refresh.clone().unwrap_or_else(|| {
            Err(AuthError::Refresh {
                status: 401,
                message: "Invalid refresh token".to_string(),
            })
        })
    }

    async fn profile(&self, _access_token: &SecretString) -> Result<User, AuthError> {
        self.profile
            .clone()
            .unwrap_or_else(|| Err(AuthError::Unauthenticated("Unauthorized".to_string())))
    }

    async fn logout(&self, _refresh_token: &SecretString) -> Result<(), AuthError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_hangs {
            std::future::pending::<()>().await;
        }
        if self.logout_fails {
            return Err(AuthError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

fn app(api: Arc<ScriptedApi>) -> Router {
    let config = SessionConfig::new("http://backend.invalid".to_string())
        .with_logout_timeout(Duration::from_millis(50));
    let state = Arc::new(AuthState::new(config, CookieConfig::new(), api));
    let (router, _openapi) = router().split_for_parts();
    router.layer(Extension(state))
}

fn post_json(uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

fn get_with_cookie(uri: &str, cookie: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())?)
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect()
}

async fn json_body(response: Response) -> Result<Value> {
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[tokio::test]
async fn teacher_login_sets_both_cookies() -> Result<()> {
    let api = Arc::new(ScriptedApi {
        login: Some(Ok(LoginGrant {
            tokens: CredentialPair::new("A", "R"),
            user: user(Role::Teacher),
        })),
        ..ScriptedApi::default()
    });

    let response = app(api)
        .oneshot(post_json(
            "/api/auth/login",
            &json!({"email": "Teacher@School.edu ", "otp": "123456"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=A;")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=R;")));

    let body = json_body(response).await?;
    assert_eq!(body["user"]["role"], "teacher");
    assert!(body.get("access_token").is_none());
    Ok(())
}

#[tokio::test]
async fn denied_role_gets_403_and_no_cookies() -> Result<()> {
    let api = Arc::new(ScriptedApi {
        login: Some(Err(AuthError::AccessDenied(
            "Access denied. Only teachers and admins can use the dashboard.".to_string(),
        ))),
        ..ScriptedApi::default()
    });

    let response = app(api)
        .oneshot(post_json(
            "/api/auth/login",
            &json!({"email": "student@school.edu", "otp": "123456"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(set_cookies(&response).is_empty());
    let body = json_body(response).await?;
    assert_eq!(
        body["message"],
        "Access denied. Only teachers and admins can use the dashboard."
    );
    Ok(())
}

#[tokio::test]
async fn login_requires_otp() -> Result<()> {
    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(post_json(
            "/api/auth/login",
            &json!({"email": "teacher@school.edu", "otp": "  "}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn malformed_body_uses_error_envelope() -> Result<()> {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/request-otp")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{"))?;

    let response = app(Arc::new(ScriptedApi::default())).oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["message"], "Invalid request body");
    Ok(())
}

#[tokio::test]
async fn request_otp_returns_backend_message() -> Result<()> {
    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(post_json(
            "/api/auth/request-otp",
            &json!({"email": "teacher@school.edu"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["message"], "OTP sent to your email");

    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(post_json("/api/auth/request-otp", &json!({"email": "nope"}))?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookies_when_backend_fails() -> Result<()> {
    let api = Arc::new(ScriptedApi {
        logout_fails: true,
        ..ScriptedApi::default()
    });

    let response = app(api.clone())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/logout")
                .header(COOKIE, "accessToken=A; refreshToken=R")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=;") && c.contains("Max-Age=0")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=;") && c.contains("Max-Age=0")));

    let body = json_body(response).await?;
    assert_eq!(body["success"], true);
    Ok(())
}

#[tokio::test]
async fn logout_is_bounded_when_backend_hangs() -> Result<()> {
    let api = Arc::new(ScriptedApi {
        logout_hangs: true,
        ..ScriptedApi::default()
    });

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        app(api).oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/logout")
                .header(COOKIE, "accessToken=A; refreshToken=R")
                .body(Body::empty())?,
        ),
    )
    .await??;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 2);
    Ok(())
}

#[tokio::test]
async fn logout_without_session_still_succeeds() -> Result<()> {
    let api = Arc::new(ScriptedApi::default());
    let response = app(api.clone())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/logout")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(api.logout_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn check_reports_expiry() -> Result<()> {
    let exp = unix_now() + 3600;
    let token = token_expiring_at(exp);

    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(get_with_cookie("/api/auth/check", &format!("accessToken={token}"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["expires_at"], exp);
    Ok(())
}

#[tokio::test]
async fn check_clears_only_expired_access_cookie() -> Result<()> {
    let token = token_expiring_at(unix_now() - 60);

    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(get_with_cookie(
            "/api/auth/check",
            &format!("accessToken={token}; refreshToken=R"),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("accessToken=;"));
    Ok(())
}

#[tokio::test]
async fn check_without_cookie_is_unauthorized() -> Result<()> {
    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(Request::builder().uri("/api/auth/check").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    Ok(())
}

#[tokio::test]
async fn token_endpoint() -> Result<()> {
    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(get_with_cookie("/api/auth/token", "accessToken=A")?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["access_token"], "A");
    assert_eq!(body["token_type"], "Bearer");

    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(Request::builder().uri("/api/auth/token").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_restores_user() -> Result<()> {
    let token = token_expiring_at(unix_now() + 3600);
    let api = Arc::new(ScriptedApi {
        profile: Some(Ok(user(Role::Admin))),
        ..ScriptedApi::default()
    });

    let response = app(api)
        .oneshot(get_with_cookie(
            "/api/auth/session",
            &format!("accessToken={token}; refreshToken=R"),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    let body = json_body(response).await?;
    assert_eq!(body["user"]["role"], "admin");
    Ok(())
}

#[tokio::test]
async fn session_refreshes_expired_access_token() -> Result<()> {
    let expired = token_expiring_at(unix_now() - 60);
    let fresh = token_expiring_at(unix_now() + 3600);
    let api = Arc::new(ScriptedApi {
        refresh: Some(Ok(CredentialPair::new(fresh.clone(), "R2"))),
        profile: Some(Ok(user(Role::Teacher))),
        ..ScriptedApi::default()
    });

    let response = app(api)
        .oneshot(get_with_cookie(
            "/api/auth/session",
            &format!("accessToken={expired}; refreshToken=R1"),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with(&format!("accessToken={fresh};"))));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=R2;")));
    Ok(())
}

#[tokio::test]
async fn session_with_expired_token_and_no_refresh_clears_cookies() -> Result<()> {
    let expired = token_expiring_at(unix_now() - 60);

    let response = app(Arc::new(ScriptedApi::default()))
        .oneshot(get_with_cookie(
            "/api/auth/session",
            &format!("accessToken={expired}"),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    Ok(())
}

#[tokio::test]
async fn session_keeps_cookies_when_backend_unreachable() -> Result<()> {
    let token = token_expiring_at(unix_now() + 3600);
    let api = Arc::new(ScriptedApi {
        profile: Some(Err(AuthError::Network("connection refused".to_string()))),
        ..ScriptedApi::default()
    });

    let response = app(api)
        .oneshot(get_with_cookie(
            "/api/auth/session",
            &format!("accessToken={token}; refreshToken=R"),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(set_cookies(&response).is_empty());
    Ok(())
}
