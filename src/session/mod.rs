//! Dashboard session management: credential storage, offline expiry checks,
//! the backend auth client, and the controller that drives the OTP login flow.
//! This module touches security boundaries and must avoid logging secrets or
//! token material.
//!
//! Flow Overview: the user requests an OTP for their email, then exchanges the
//! emailed code for an access/refresh pair. Only teachers and admins are
//! admitted. The pair is stored as a unit; an expired or rejected access token
//! is refreshed once before the session is dropped.

pub mod client;
pub mod config;
pub mod controller;
pub mod cookies;
pub mod error;
pub mod inspector;
pub mod store;
pub mod types;

pub use client::{AuthApi, HttpAuthClient};
pub use config::SessionConfig;
pub use controller::{SessionController, SessionSnapshot, SessionState};
pub use cookies::{CookieConfig, CookieTokenStore};
pub use error::AuthError;
pub use store::{MemoryTokenStore, TokenStore};
pub use types::{CredentialPair, LoginGrant, Role, User};
