//! Shared state for the auth facade.

use crate::session::{
    AuthApi, AuthError, CookieConfig, CookieTokenStore, HttpAuthClient, SessionConfig,
    SessionController,
};
use axum::http::HeaderMap;
use std::sync::Arc;

pub struct AuthState {
    api: Arc<dyn AuthApi>,
    config: SessionConfig,
    cookies: CookieConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(config: SessionConfig, cookies: CookieConfig, api: Arc<dyn AuthApi>) -> Self {
        Self {
            api,
            config,
            cookies,
        }
    }

    /// State backed by the HTTP client for `config.api_url()`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(config: SessionConfig, cookies: CookieConfig) -> Result<Self, AuthError> {
        let api = HttpAuthClient::new(config.api_url(), config.request_timeout())?;
        Ok(Self::new(config, cookies, Arc::new(api)))
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }

    pub(super) fn cookie_store(&self, headers: &HeaderMap) -> Arc<CookieTokenStore> {
        Arc::new(CookieTokenStore::from_headers(self.cookies.clone(), headers))
    }

    /// Request-scoped controller over the caller's token cookies.
    pub(super) fn session(&self, headers: &HeaderMap) -> (Arc<CookieTokenStore>, SessionController) {
        let store = self.cookie_store(headers);
        let controller = SessionController::new(store.clone(), Arc::clone(&self.api))
            .with_logout_timeout(self.config.logout_timeout());
        (store, controller)
    }
}
