//! # GradeX session gateway
//!
//! `gradex` fronts the GradeX admin dashboard. Teachers and admins sign in
//! with an emailed one-time password; the gateway exchanges it with the
//! GradeX backend, keeps the resulting access/refresh pair in `HttpOnly`
//! cookies and exposes the session to the dashboard through a small
//! same-origin `/api/auth/*` facade.
//!
//! ## Layout
//!
//! - [`session`]: token storage, offline expiry checks, the backend client and
//!   the session controller.
//! - [`guard`]: request-time redirect of anonymous visitors to the login page.
//! - [`api`]: axum router, auth handlers, health probe and `OpenAPI` document.
//! - [`cli`]: command line, configuration and telemetry setup.
//!
//! Students are rejected at login. A rejected or expired access token is
//! refreshed once; if that fails the cookies are cleared.

pub mod api;
pub mod cli;
pub mod guard;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
