use clap::{Arg, ArgAction, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("login-path")
                .long("login-path")
                .help("Path anonymous visitors are redirected to")
                .env("GRADEX_LOGIN_PATH")
                .default_value("/login"),
        )
        .arg(
            Arg::new("public-route")
                .long("public-route")
                .help("Extra public path prefix (repeatable or comma separated)")
                .env("GRADEX_PUBLIC_ROUTES")
                .action(ArgAction::Append)
                .value_delimiter(','),
        )
        .arg(
            Arg::new("static-dir")
                .long("static-dir")
                .help("Directory with the built dashboard, served behind the route guard")
                .env("GRADEX_STATIC_DIR")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
}
