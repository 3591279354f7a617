use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Dashboard origin; used for CORS and to decide Secure cookies")
                .env("GRADEX_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("access-token-ttl-days")
                .long("access-token-ttl-days")
                .help("Access token cookie lifetime in days")
                .env("GRADEX_ACCESS_TOKEN_TTL_DAYS")
                .default_value("14")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("refresh-token-ttl-days")
                .long("refresh-token-ttl-days")
                .help("Refresh token cookie lifetime in days")
                .env("GRADEX_REFRESH_TOKEN_TTL_DAYS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("request-timeout-seconds")
                .long("request-timeout-seconds")
                .help("Timeout for every backend auth request")
                .env("GRADEX_REQUEST_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("logout-timeout-seconds")
                .long("logout-timeout-seconds")
                .help("Upper bound for the backend logout call; cookies are cleared regardless")
                .env("GRADEX_LOGOUT_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
