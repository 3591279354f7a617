//! Cookie-backed token store for the HTTP facade.
//!
//! The browser keeps the credential pair in two `HttpOnly` cookies, so tokens
//! survive reloads without ever being readable from page scripts. A
//! `CookieTokenStore` lives for one request: it starts from the request
//! `Cookie` header and records every change so the handler can emit the
//! matching `Set-Cookie` headers.

use super::{store::TokenStore, types::CredentialPair};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use secrecy::{ExposeSecret, SecretString};
use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};
use tracing::error;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);
const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Names, lifetimes and flags of the token cookies.
#[derive(Clone, Debug)]
pub struct CookieConfig {
    access_name: String,
    refresh_name: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            access_name: ACCESS_TOKEN_COOKIE.to_string(),
            refresh_name: REFRESH_TOKEN_COOKIE.to_string(),
            access_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            secure: false,
        }
    }
}

impl CookieConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Only mark cookies secure when the dashboard is served over HTTPS.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn access_name(&self) -> &str {
        &self.access_name
    }

    #[must_use]
    pub fn refresh_name(&self) -> &str {
        &self.refresh_name
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn cookie(&self, name: &str, value: &str, ttl: Duration) -> Result<HeaderValue, InvalidHeaderValue> {
        let max_age = ttl.as_secs();
        let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Change {
    Unchanged,
    Set,
    Cleared,
}

struct Jar {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
    access_change: Change,
    refresh_change: Change,
}

/// Request-scoped view of the token cookies.
pub struct CookieTokenStore {
    config: CookieConfig,
    jar: Mutex<Jar>,
}

impl CookieTokenStore {
    /// Reads the token cookies from the incoming request headers.
    #[must_use]
    pub fn from_headers(config: CookieConfig, headers: &HeaderMap) -> Self {
        let access = read_cookie(headers, config.access_name()).map(SecretString::from);
        let refresh = read_cookie(headers, config.refresh_name()).map(SecretString::from);
        Self {
            config,
            jar: Mutex::new(Jar {
                access,
                refresh,
                access_change: Change::Unchanged,
                refresh_change: Change::Unchanged,
            }),
        }
    }

    /// Drops only the access token, leaving the refresh token for a later
    /// refresh attempt.
    pub fn clear_access_token(&self) {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        jar.access = None;
        jar.access_change = Change::Cleared;
    }

    /// `Set-Cookie` values for every cookie changed during this request.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
        let jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        let mut headers = Vec::new();

        let cookies = [
            (
                self.config.access_name(),
                jar.access.as_ref(),
                jar.access_change,
                self.config.access_ttl(),
            ),
            (
                self.config.refresh_name(),
                jar.refresh.as_ref(),
                jar.refresh_change,
                self.config.refresh_ttl(),
            ),
        ];

        for (name, value, change, ttl) in cookies {
            let cookie = match (change, value) {
                (Change::Set, Some(value)) => self.config.cookie(name, value.expose_secret(), ttl),
                (Change::Cleared, _) | (Change::Set, None) => {
                    self.config.cookie(name, "", Duration::ZERO)
                }
                (Change::Unchanged, _) => continue,
            };
            match cookie {
                Ok(cookie) => headers.push(cookie),
                // Never echo the value; it may be a token.
                Err(_) => error!("Failed to build {name} cookie header"),
            }
        }

        headers
    }
}

impl TokenStore for CookieTokenStore {
    fn set_tokens(&self, tokens: CredentialPair) {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        jar.access = Some(tokens.access_token);
        jar.refresh = Some(tokens.refresh_token);
        jar.access_change = Change::Set;
        jar.refresh_change = Change::Set;
    }

    fn access_token(&self) -> Option<SecretString> {
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .clone()
    }

    fn refresh_token(&self) -> Option<SecretString> {
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .clone()
    }

    fn clear_tokens(&self) {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        jar.access = None;
        jar.refresh = None;
        jar.access_change = Change::Cleared;
        jar.refresh_change = Change::Cleared;
    }
}

/// Returns a non-empty cookie value by name from every `Cookie` header.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}
