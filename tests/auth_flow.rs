//! End-to-end dashboard auth flows: browser-facing facade on one side, a
//! mocked GradeX backend on the other.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Method, Request, Response, StatusCode,
    },
    Router,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use gradex::{
    api::{self, AuthState},
    guard::RouteGuard,
    session::{CookieConfig, SessionConfig},
};
use serde_json::{json, Value};
use std::{
    net::TcpListener,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

fn jwt(exp: i64) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = Base64UrlUnpadded::encode_string(json!({"sub": "u1", "exp": exp}).to_string().as_bytes());
    format!("{header}.{claims}.signature")
}

fn backend_user(role: &str) -> Value {
    json!({
        "_id": "64f1c2",
        "email": "teacher@school.edu",
        "name": "Ada Lovelace",
        "role": role,
        "is_verified": true,
        "xp": 120,
        "streak": 4
    })
}

fn app(api_url: &str) -> Result<Router> {
    let session = SessionConfig::new(api_url.to_string())
        .with_request_timeout(Duration::from_secs(2))
        .with_logout_timeout(Duration::from_millis(500));
    let state = AuthState::connect(session, CookieConfig::new())?;
    api::app(Arc::new(state), RouteGuard::default(), None)
}

fn post_json(uri: &str, body: &Value, cookie: Option<&str>) -> Result<Request<Body>> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    Ok(request.body(Body::from(serde_json::to_vec(body)?))?)
}

fn get(uri: &str, cookie: Option<&str>) -> Result<Request<Body>> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    Ok(request.body(Body::empty())?)
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect()
}

/// `name=value` pairs of the non-cleared cookies, ready for a `Cookie` header.
fn cookie_header(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .filter_map(|cookie| cookie.split(';').next())
        .filter(|pair| !pair.ends_with('='))
        .collect::<Vec<_>>()
        .join("; ")
}

async fn json_body(response: Response<Body>) -> Result<Value> {
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    serde_json::from_slice(&body).context("response body is not JSON")
}

#[tokio::test]
async fn teacher_signs_in_browses_and_signs_out() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind localhost");
        return Ok(());
    }

    let backend = MockServer::start().await;
    let access = jwt(now() + 3600);

    Mock::given(method("POST"))
        .and(path("/auth/request-otp"))
        .and(body_json(json!({"email": "teacher@school.edu"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "OTP sent"})))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "teacher@school.edu", "otp": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access,
            "refresh_token": "R",
            "token_type": "bearer",
            "user": backend_user("teacher")
        })))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/profile"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(backend_user("teacher")))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(body_json(json!({"refresh_token": "R"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&backend)
        .await;

    let app = app(&backend.uri())?;

    // Anonymous visitors are sent to login.
    let response = app.clone().oneshot(get("/admin/quizzes", None)?).await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
        Some("/login?redirect=%2Fadmin%2Fquizzes")
    );

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/request-otp",
            &json!({"email": " Teacher@School.edu "}),
            None,
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["message"], "OTP sent");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            &json!({"email": "teacher@school.edu", "otp": "123456"}),
            None,
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|c| c.starts_with(&format!("accessToken={access};")) && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=R;")));
    let body = json_body(response).await?;
    assert_eq!(body["user"]["role"], "teacher");
    assert_eq!(body["user"]["id"], "64f1c2");
    let jar = cookie_header(&cookies);

    let response = app.clone().oneshot(get("/api/auth/session", Some(&jar))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["user"]["name"], "Ada Lovelace");

    let response = app.clone().oneshot(get("/api/auth/check", Some(&jar))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["authenticated"], true);

    // Guard passes; nothing is served without a dashboard directory.
    let response = app.clone().oneshot(get("/admin/quizzes", Some(&jar))?).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post_json("/api/auth/logout", &json!({}), Some(&jar))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = set_cookies(&response);
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
    assert!(cookie_header(&cleared).is_empty());

    backend.verify().await;
    Ok(())
}

#[tokio::test]
async fn student_is_rejected_without_cookies() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind localhost");
        return Ok(());
    }

    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": jwt(now() + 3600),
            "refresh_token": "R",
            "user": backend_user("student")
        })))
        .mount(&backend)
        .await;

    let response = app(&backend.uri())?
        .oneshot(post_json(
            "/api/auth/login",
            &json!({"email": "student@school.edu", "otp": "123456"}),
            None,
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(
        json_body(response).await?["message"],
        "Access denied. Only teachers and admins can use the dashboard."
    );
    Ok(())
}

#[tokio::test]
async fn invalid_otp_keeps_backend_status_and_message() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind localhost");
        return Ok(());
    }

    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid or expired OTP"})))
        .mount(&backend)
        .await;

    let response = app(&backend.uri())?
        .oneshot(post_json(
            "/api/auth/login",
            &json!({"email": "teacher@school.edu", "otp": "000000"}),
            None,
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(json_body(response).await?["message"], "Invalid or expired OTP");
    Ok(())
}

#[tokio::test]
async fn expired_access_token_is_refreshed_once() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind localhost");
        return Ok(());
    }

    let backend = MockServer::start().await;
    let expired = jwt(now() - 60);
    let fresh = jwt(now() + 3600);

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": fresh,
            "refresh_token": "R2"
        })))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/profile"))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(backend_user("admin")))
        .expect(1)
        .mount(&backend)
        .await;

    let response = app(&backend.uri())?
        .oneshot(get(
            "/api/auth/session",
            Some(&format!("accessToken={expired}; refreshToken=R1")),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with(&format!("accessToken={fresh};"))));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=R2;")));
    assert_eq!(json_body(response).await?["user"]["role"], "admin");

    backend.verify().await;
    Ok(())
}

#[tokio::test]
async fn rejected_refresh_clears_the_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind localhost");
        return Ok(());
    }

    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid refresh token"})))
        .expect(1)
        .mount(&backend)
        .await;

    let response = app(&backend.uri())?
        .oneshot(get(
            "/api/auth/session",
            Some(&format!("accessToken={}; refreshToken=R1", jwt(now() - 60))),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

    backend.verify().await;
    Ok(())
}

#[tokio::test]
async fn refresh_outage_keeps_the_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind localhost");
        return Ok(());
    }

    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "maintenance"})))
        .expect(1)
        .mount(&backend)
        .await;

    let response = app(&backend.uri())?
        .oneshot(get(
            "/api/auth/session",
            Some(&format!("accessToken={}; refreshToken=R1", jwt(now() - 60))),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(set_cookies(&response).is_empty());
    let body = json_body(response).await?;
    assert!(body["message"]
        .as_str()
        .is_some_and(|message| message.contains("maintenance")));

    backend.verify().await;
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookies_when_backend_is_down() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind localhost");
        return Ok(());
    }

    // Grab a free port, then release it so nothing is listening there.
    let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    let response = app(&format!("http://127.0.0.1:{port}"))?
        .oneshot(post_json(
            "/api/auth/logout",
            &json!({}),
            Some("accessToken=A; refreshToken=R"),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(json_body(response).await?["success"], true);
    Ok(())
}
