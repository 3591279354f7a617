use crate::{
    api::{self, AuthState},
    cli::telemetry,
    guard::{RouteGuard, RoutePolicy},
    session::{CookieConfig, SessionConfig},
};
use anyhow::{Context, Result};
use std::{fmt::Write, path::PathBuf, sync::Arc, time::Duration};
use tracing::info;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub api_url: String,
    pub frontend_base_url: String,
    pub access_token_ttl_days: u64,
    pub refresh_token_ttl_days: u64,
    pub login_path: String,
    pub public_routes: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub request_timeout_seconds: u64,
    pub logout_timeout_seconds: u64,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.api_url.clone())
            .with_frontend_base_url(self.frontend_base_url.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_seconds))
            .with_logout_timeout(Duration::from_secs(self.logout_timeout_seconds))
    }

    fn cookie_config(&self, session: &SessionConfig) -> CookieConfig {
        CookieConfig::new()
            .with_access_ttl(days(self.access_token_ttl_days))
            .with_refresh_ttl(days(self.refresh_token_ttl_days))
            .with_secure(session.cookie_secure())
    }

    fn route_guard(&self, cookies: &CookieConfig) -> RouteGuard {
        let policy = self
            .public_routes
            .iter()
            .fold(RoutePolicy::new(), |policy, route| policy.with_public(route));
        RouteGuard::new(policy)
            .with_login_path(&self.login_path)
            .with_cookie_name(cookies.access_name())
    }
}

fn days(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(SECONDS_PER_DAY))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the backend client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let session = args.session_config();
    let cookies = args.cookie_config(&session);
    let guard = args.route_guard(&cookies);

    let auth_state =
        AuthState::connect(session, cookies).context("Failed to build backend auth client")?;

    let result = api::new(
        args.port,
        Arc::new(auth_state),
        guard,
        args.static_dir.as_deref(),
    )
    .await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("api_url", args.api_url.clone()),
        ("frontend_base_url", args.frontend_base_url.clone()),
        ("access_token_ttl_days", args.access_token_ttl_days.to_string()),
        ("refresh_token_ttl_days", args.refresh_token_ttl_days.to_string()),
        ("login_path", args.login_path.clone()),
        ("public_routes", args.public_routes.join(",")),
        (
            "static_dir",
            args.static_dir
                .as_ref()
                .map_or_else(|| "none".to_string(), |dir| dir.display().to_string()),
        ),
        ("request_timeout_seconds", args.request_timeout_seconds.to_string()),
        ("logout_timeout_seconds", args.logout_timeout_seconds.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ = write!(message, "\n  {key}:{padding} {value}");
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
