use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use std::path::PathBuf;
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let api_url = matches
        .get_one::<String>("api-url")
        .cloned()
        .context("missing required argument: --api-url")?;
    Url::parse(&api_url).context("invalid GRADEX_API_URL")?;

    let frontend_base_url = matches
        .get_one::<String>("frontend-base-url")
        .cloned()
        .unwrap_or_else(|| "http://localhost:3000".to_string());
    Url::parse(&frontend_base_url).context("invalid GRADEX_FRONTEND_BASE_URL")?;

    let login_path = matches
        .get_one::<String>("login-path")
        .cloned()
        .unwrap_or_else(|| "/login".to_string());

    let public_routes = matches
        .get_many::<String>("public-route")
        .map(|routes| {
            routes
                .map(|route| route.trim().to_string())
                .filter(|route| !route.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        api_url,
        frontend_base_url,
        access_token_ttl_days: u64_arg(matches, "access-token-ttl-days", 14),
        refresh_token_ttl_days: u64_arg(matches, "refresh-token-ttl-days", 30),
        login_path,
        public_routes,
        static_dir: matches.get_one::<PathBuf>("static-dir").cloned(),
        request_timeout_seconds: u64_arg(matches, "request-timeout-seconds", 10),
        logout_timeout_seconds: u64_arg(matches, "logout-timeout-seconds", 5),
    }))
}

fn u64_arg(matches: &clap::ArgMatches, id: &str, default: u64) -> u64 {
    matches.get_one::<u64>(id).copied().unwrap_or(default)
}
