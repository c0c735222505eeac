use crate::cli::{
    actions::{server::Args, Action},
    commands::verify,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let secret = matches
        .get_one::<String>(verify::ARG_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --secret")?;
    let issuer = matches
        .get_one::<String>(verify::ARG_ISSUER)
        .cloned()
        .context("missing argument: --issuer")?;
    let provider_name = matches
        .get_one::<String>(verify::ARG_PROVIDER_NAME)
        .cloned()
        .context("missing argument: --provider-name")?;

    let allowed_redirect_hosts = matches
        .get_many::<String>(verify::ARG_REDIRECT_HOSTS)
        .map(|hosts| {
            hosts
                .map(|host| host.trim().to_string())
                .filter(|host| !host.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        secret,
        issuer,
        provider_name,
        with_password: matches.get_flag(verify::ARG_WITH_PASSWORD),
        use_gravatar: matches.get_flag(verify::ARG_USE_GRAVATAR),
        template: matches.get_one::<String>(verify::ARG_TEMPLATE).map(PathBuf::from),
        session_ttl_seconds: matches
            .get_one::<i64>(verify::ARG_SESSION_TTL)
            .copied()
            .unwrap_or(12 * 60 * 60),
        cookie_secure: matches.get_flag(verify::ARG_COOKIE_SECURE),
        allowed_redirect_hosts,
    }))
}
