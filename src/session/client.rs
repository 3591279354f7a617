//! Client for the GradeX backend auth endpoints. Every call maps 1:1 to a
//! backend route and surfaces backend rejections with their original status
//! and message. Token values are never logged.

use super::{
    error::AuthError,
    types::{
        CredentialPair, LoginBody, LoginGrant, LoginResponse, MessageResponse, RefreshTokenBody,
        RequestOtpBody, TokenResponse, User,
    },
};
use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default request timeout applied to every backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

/// Backend auth operations used by the session controller.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Asks the backend to email a one-time password. Returns the backend message.
    async fn request_otp(&self, email: &str) -> Result<String, AuthError>;

    /// Exchanges an OTP for credentials. Users outside the dashboard roles are
    /// rejected with `AccessDenied` and their tokens are dropped.
    async fn login(&self, email: &str, otp: &str) -> Result<LoginGrant, AuthError>;

    async fn refresh(&self, refresh_token: &SecretString) -> Result<CredentialPair, AuthError>;

    async fn profile(&self, access_token: &SecretString) -> Result<User, AuthError>;

    /// Invalidates the refresh token server-side.
    async fn logout(&self, refresh_token: &SecretString) -> Result<(), AuthError>;
}

/// reqwest-backed `AuthApi` talking JSON to the backend base URL.
#[derive(Clone, Debug)]
pub struct HttpAuthClient {
    client: Client,
    base_url: String,
}

impl HttpAuthClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        build_url_with_base(&self.base_url, path)
    }
}

#[async_trait]
impl AuthApi for HttpAuthClient {
    #[instrument(skip(self, email))]
    async fn request_otp(&self, email: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .post(self.url("/auth/request-otp"))
            .json(&RequestOtpBody { email })
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            debug!("OTP request rejected: {status}");
            return Err(AuthError::OtpRequest { status, message });
        }

        let body: MessageResponse = decode(response).await?;
        Ok(body
            .message
            .unwrap_or_else(|| "OTP sent successfully".to_string()))
    }

    #[instrument(skip(self, email, otp))]
    async fn login(&self, email: &str, otp: &str) -> Result<LoginGrant, AuthError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginBody { email, otp })
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            debug!("OTP verification rejected: {status}");
            return Err(AuthError::InvalidOtp { status, message });
        }

        let body: LoginResponse = decode(response).await?;
        if !body.user.role.can_use_dashboard() {
            warn!(
                role = body.user.role.as_str(),
                "Rejected login for a role without dashboard access"
            );
            return Err(AuthError::AccessDenied(
                "Access denied. Only teachers and admins can use the dashboard.".to_string(),
            ));
        }

        Ok(LoginGrant {
            tokens: body.tokens.into(),
            user: body.user,
        })
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &SecretString) -> Result<CredentialPair, AuthError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&RefreshTokenBody {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status.is_server_error() {
            let (status, message) = error_parts(response).await;
            warn!("Token refresh unavailable: {status}");
            return Err(AuthError::Upstream { status, message });
        }
        if !status.is_success() {
            let (status, message) = error_parts(response).await;
            debug!("Token refresh rejected: {status}");
            return Err(AuthError::Refresh { status, message });
        }

        let body: TokenResponse = decode(response).await?;
        Ok(body.into())
    }

    #[instrument(skip_all)]
    async fn profile(&self, access_token: &SecretString) -> Result<User, AuthError> {
        let response = self
            .client
            .get(self.url("/auth/profile"))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let (_, message) = error_parts(response).await;
            return Err(AuthError::Unauthenticated(message));
        }
        if !status.is_success() {
            let (status, message) = error_parts(response).await;
            return Err(AuthError::Upstream { status, message });
        }

        decode(response).await
    }

    #[instrument(skip_all)]
    async fn logout(&self, refresh_token: &SecretString) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .json(&RefreshTokenBody {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            let (status, message) = error_parts(response).await;
            Err(AuthError::Upstream { status, message })
        }
    }
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Maps transport errors into `Network` with timeout detection.
fn map_request_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Network("Request timed out. Please try again.".to_string())
    } else {
        AuthError::Network(format!("Unable to reach the server: {err}"))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
    let bytes = response.bytes().await.map_err(map_request_error)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| AuthError::Protocol(format!("Failed to decode response: {err}")))
}

/// Status plus a user-facing message from a rejected backend response.
async fn error_parts(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, error_message(&body))
}

fn error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(body) {
        for key in ["message", "detail", "error"] {
            if let Some(serde_json::Value::String(message)) = fields.get(key) {
                return sanitize_body(message);
            }
        }
    }
    sanitize_body(body)
}

/// Trims and truncates error bodies for user-facing messages.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
