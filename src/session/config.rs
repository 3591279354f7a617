//! Backend and timing configuration shared by every session operation.

use std::time::Duration;

use super::{client::DEFAULT_TIMEOUT, controller::DEFAULT_LOGOUT_TIMEOUT};

const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    api_url: String,
    frontend_base_url: String,
    request_timeout: Duration,
    logout_timeout: Duration,
}

impl SessionConfig {
    #[must_use]
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, frontend_base_url: String) -> Self {
        self.frontend_base_url = frontend_base_url;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn logout_timeout(&self) -> Duration {
        self.logout_timeout
    }

    /// Cookies carry `Secure` only when the dashboard is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}
