use clap::{builder::BoolishValueParser, Arg, ArgAction, Command};

pub const ARG_SECRET: &str = "secret";
pub const ARG_ISSUER: &str = "issuer";
pub const ARG_PROVIDER_NAME: &str = "provider-name";
pub const ARG_WITH_PASSWORD: &str = "with-password";
pub const ARG_USE_GRAVATAR: &str = "use-gravatar";
pub const ARG_TEMPLATE: &str = "template";
pub const ARG_SESSION_TTL: &str = "session-ttl";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_REDIRECT_HOSTS: &str = "allowed-redirect-hosts";

fn flag(name: &'static str, env: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .env(env)
        .action(ArgAction::SetTrue)
        .value_parser(BoolishValueParser::new())
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET)
                .long(ARG_SECRET)
                .help("Secret used to sign confirmation and session tokens")
                .env("CONFERMA_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ISSUER)
                .long(ARG_ISSUER)
                .help("Issuer written into and required from every token")
                .default_value("conferma")
                .env("CONFERMA_ISSUER"),
        )
        .arg(
            Arg::new(ARG_PROVIDER_NAME)
                .long(ARG_PROVIDER_NAME)
                .help("Provider name, prefix of every user ID")
                .default_value("email")
                .env("CONFERMA_PROVIDER_NAME"),
        )
        .arg(flag(
            ARG_WITH_PASSWORD,
            "CONFERMA_WITH_PASSWORD",
            "Require a password step after the confirmation",
        ))
        .arg(flag(
            ARG_USE_GRAVATAR,
            "CONFERMA_USE_GRAVATAR",
            "Look up a Gravatar picture for confirmed email addresses",
        ))
        .arg(
            Arg::new(ARG_TEMPLATE)
                .long(ARG_TEMPLATE)
                .help("Path to the confirmation message template")
                .env("CONFERMA_TEMPLATE"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session lifetime in seconds")
                .default_value("43200")
                .env("CONFERMA_SESSION_TTL")
                .value_parser(clap::value_parser!(i64).range(60..)),
        )
        .arg(flag(
            ARG_COOKIE_SECURE,
            "CONFERMA_COOKIE_SECURE",
            "Mark the session cookie Secure (HTTPS only)",
        ))
        .arg(
            Arg::new(ARG_REDIRECT_HOSTS)
                .long(ARG_REDIRECT_HOSTS)
                .help("Comma separated hosts a login may redirect back to")
                .env("CONFERMA_ALLOWED_REDIRECT_HOSTS")
                .value_delimiter(','),
        )
}
