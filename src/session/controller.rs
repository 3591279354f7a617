//! Session controller for the dashboard.
//!
//! One controller instance owns the in-memory session (user, loading and
//! error flags) and derives authentication from its `TokenStore`. Consumers
//! subscribe to `SessionSnapshot` updates instead of caching their own copy.
//!
//! Flow Overview: `initialize` resolves stored credentials into a user (one
//! silent refresh when the access token is expired or rejected), `login`
//! exchanges an OTP for credentials, and `logout` always tears the local
//! session down even when the backend cannot be reached.

use super::{
    client::AuthApi,
    error::AuthError,
    inspector,
    store::TokenStore,
    types::{CredentialPair, User},
};
use regex::Regex;
use secrecy::ExposeSecret;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::watch, time::timeout};
use tracing::{debug, info, instrument, warn};

pub(crate) const DEFAULT_LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    Authenticated,
    Anonymous,
}

/// Observable session state. `user` is only set while `Authenticated`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
    /// Email of the last successful OTP request, kept so a failed
    /// verification can be retried without re-entering it.
    pub otp_email: Option<String>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated && self.user.is_some()
    }
}

pub struct SessionController {
    store: Arc<dyn TokenStore>,
    api: Arc<dyn AuthApi>,
    logout_timeout: Duration,
    snapshot: watch::Sender<SessionSnapshot>,
    torn_down: AtomicBool,
}

impl SessionController {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, api: Arc<dyn AuthApi>) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            store,
            api,
            logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
            snapshot,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Upper bound for the backend logout call; local teardown never waits longer.
    #[must_use]
    pub fn with_logout_timeout(mut self, logout_timeout: Duration) -> Self {
        self.logout_timeout = logout_timeout;
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Resolves stored credentials into a session. Runs before any consumer
    /// reads `user` for access decisions.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionState {
        self.publish(|snapshot| {
            snapshot.state = SessionState::Initializing;
            snapshot.loading = true;
        });

        let outcome = self.restore().await;
        if self.is_torn_down() {
            return self.snapshot().state;
        }

        match outcome {
            Ok(Some(user)) => {
                info!("Session restored");
                self.publish(|snapshot| {
                    snapshot.state = SessionState::Authenticated;
                    snapshot.user = Some(user);
                    snapshot.loading = false;
                    snapshot.error = None;
                });
            }
            Ok(None) => self.publish(|snapshot| {
                snapshot.state = SessionState::Anonymous;
                snapshot.user = None;
                snapshot.loading = false;
            }),
            Err(err) => {
                // Credentials were already dropped when the error is terminal.
                debug!("Session initialization failed: {err}");
                self.publish(|snapshot| {
                    snapshot.state = SessionState::Anonymous;
                    snapshot.user = None;
                    snapshot.loading = false;
                    snapshot.error = err.is_retryable().then(|| err.to_string());
                });
            }
        }

        self.snapshot().state
    }

    /// Requests an OTP email. Session state is left untouched.
    ///
    /// # Errors
    /// Returns `Validation` for an empty or malformed email, otherwise the
    /// backend failure. The error is also recorded in the snapshot.
    #[instrument(skip_all)]
    pub async fn request_otp(&self, email: &str) -> Result<String, AuthError> {
        let email = normalize_email(email);
        if let Err(err) = validate_email(&email) {
            self.record_error(&err);
            return Err(err);
        }

        self.begin();
        let result = self.api.request_otp(&email).await;
        if self.is_torn_down() {
            return result;
        }

        match &result {
            Ok(_) => self.publish(|snapshot| {
                snapshot.loading = false;
                snapshot.otp_email = Some(email.clone());
            }),
            Err(err) => self.fail(err),
        }
        result
    }

    /// Verifies an OTP and establishes the session.
    ///
    /// # Errors
    /// Returns `Validation` for missing input, `InvalidOtp` when the backend
    /// rejects the code and `AccessDenied` for roles without dashboard access.
    /// No credentials are stored on failure.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, otp: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        let otp = otp.trim();
        let validation = validate_email(&email).and_then(|()| {
            if otp.is_empty() {
                Err(AuthError::Validation("Email and OTP are required".to_string()))
            } else {
                Ok(())
            }
        });
        if let Err(err) = validation {
            self.record_error(&err);
            return Err(err);
        }

        self.begin();
        let result = self.api.login(&email, otp).await;
        if self.is_torn_down() {
            return result.map(|grant| grant.user);
        }

        match result {
            Ok(grant) => {
                self.store.set_tokens(grant.tokens);
                info!(role = grant.user.role.as_str(), "Login succeeded");
                let user = grant.user;
                self.publish(|snapshot| {
                    snapshot.state = SessionState::Authenticated;
                    snapshot.user = Some(user.clone());
                    snapshot.loading = false;
                    snapshot.error = None;
                });
                Ok(user)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Ends the session. The backend is asked to revoke the refresh token,
    /// but local credentials and `user` are cleared regardless of the outcome.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let refresh_token = self.store.refresh_token();
        let _teardown = LocalTeardown { controller: self };

        self.publish(|snapshot| snapshot.loading = true);
        let Some(refresh_token) = refresh_token else {
            return;
        };

        match timeout(self.logout_timeout, self.api.logout(&refresh_token)).await {
            Ok(Ok(())) => debug!("Refresh token revoked"),
            Ok(Err(err)) => warn!("Backend logout failed: {err}"),
            Err(_) => warn!("Backend logout timed out"),
        }
    }

    /// Fetches the current user, refreshing credentials once when the access
    /// token is rejected.
    ///
    /// # Errors
    /// Returns `Unauthenticated` without credentials, `Refresh` when the
    /// refresh token is rejected (the session is torn down), or a retryable
    /// error that leaves the credentials in place.
    pub async fn current_user(&self) -> Result<User, AuthError> {
        let result = self.restore().await;
        if self.is_torn_down() {
            return result.and_then(|user| user.ok_or_else(no_session));
        }

        match result {
            Ok(Some(user)) => {
                self.publish(|snapshot| {
                    snapshot.state = SessionState::Authenticated;
                    snapshot.user = Some(user.clone());
                });
                Ok(user)
            }
            Ok(None) => {
                self.reset_user();
                Err(no_session())
            }
            Err(err) => {
                if !err.is_retryable() {
                    self.reset_user();
                }
                Err(err)
            }
        }
    }

    pub fn clear_error(&self) {
        self.publish(|snapshot| snapshot.error = None);
    }

    /// Detaches the controller. Calls still in flight complete without
    /// touching the store or publishing state.
    pub fn shutdown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Stored credentials to user. `Ok(None)` means there is no session and
    /// nothing left to clear.
    async fn restore(&self) -> Result<Option<User>, AuthError> {
        let Some(access_token) = self.store.access_token() else {
            return Ok(None);
        };

        if inspector::is_expired(access_token.expose_secret()) {
            debug!("Stored access token is expired");
            return self.refresh_and_fetch().await.map(Some);
        }

        match self.api.profile(&access_token).await {
            Ok(user) => Ok(Some(user)),
            Err(AuthError::Unauthenticated(_)) => {
                debug!("Access token rejected, attempting refresh");
                self.refresh_and_fetch().await.map(Some)
            }
            Err(err) => Err(err),
        }
    }

    /// Single refresh attempt followed by one profile fetch. Any terminal
    /// failure tears the local session down.
    async fn refresh_and_fetch(&self) -> Result<User, AuthError> {
        let Some(refresh_token) = self.store.refresh_token() else {
            self.teardown_tokens();
            return Err(AuthError::Refresh {
                status: 401,
                message: "Session expired. Please sign in again.".to_string(),
            });
        };

        let tokens = match self.api.refresh(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(err) => {
                if !err.is_retryable() {
                    self.teardown_tokens();
                }
                return Err(err);
            }
        };

        let access_token = tokens.access_token.clone();
        self.persist(tokens);

        match self.api.profile(&access_token).await {
            Ok(user) => Ok(user),
            Err(AuthError::Unauthenticated(message)) => {
                self.teardown_tokens();
                Err(AuthError::Refresh {
                    status: 401,
                    message,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn persist(&self, tokens: CredentialPair) {
        if !self.is_torn_down() {
            self.store.set_tokens(tokens);
        }
    }

    fn teardown_tokens(&self) {
        if !self.is_torn_down() {
            self.store.clear_tokens();
        }
    }

    fn reset_user(&self) {
        self.publish(|snapshot| {
            snapshot.state = SessionState::Anonymous;
            snapshot.user = None;
        });
    }

    fn begin(&self) {
        self.publish(|snapshot| {
            snapshot.loading = true;
            snapshot.error = None;
        });
    }

    fn fail(&self, err: &AuthError) {
        self.publish(|snapshot| {
            snapshot.loading = false;
            snapshot.error = Some(err.to_string());
        });
    }

    fn record_error(&self, err: &AuthError) {
        self.publish(|snapshot| snapshot.error = Some(err.to_string()));
    }

    fn publish(&self, update: impl FnOnce(&mut SessionSnapshot)) {
        if self.is_torn_down() {
            return;
        }
        self.snapshot.send_modify(update);
    }
}

/// Clears local credentials and the user when dropped, whether `logout`
/// returns normally or its future is dropped mid-flight.
struct LocalTeardown<'a> {
    controller: &'a SessionController,
}

impl Drop for LocalTeardown<'_> {
    fn drop(&mut self) {
        self.controller.store.clear_tokens();
        self.controller.publish(|snapshot| {
            snapshot.state = SessionState::Anonymous;
            snapshot.user = None;
            snapshot.loading = false;
            snapshot.otp_email = None;
        });
        info!("Local session cleared");
    }
}

fn no_session() -> AuthError {
    AuthError::Unauthenticated("No active session".to_string())
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::Validation("Email is required".to_string()));
    }
    if !valid_email(email) {
        return Err(AuthError::Validation("Enter a valid email address".to_string()));
    }
    Ok(())
}

/// Basic email format check on already-normalized input.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}
