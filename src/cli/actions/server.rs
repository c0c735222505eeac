use crate::{
    cli::telemetry,
    conferma::{
        self,
        sender::LogSender,
        template::MessageTemplate,
        token::{JwtConfig, JwtService},
        VerifyConfig, VerifyProvider,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub secret: SecretString,
    pub issuer: String,
    pub provider_name: String,
    pub with_password: bool,
    pub use_gravatar: bool,
    pub template: Option<PathBuf>,
    pub session_ttl_seconds: i64,
    pub cookie_secure: bool,
    pub allowed_redirect_hosts: Vec<String>,
}

/// Load the message template, falling back to the built-in one.
///
/// # Errors
/// Returns an error if the file cannot be read or holds an invalid template.
pub async fn load_template(path: Option<&PathBuf>) -> Result<MessageTemplate> {
    let Some(path) = path else {
        return Ok(MessageTemplate::default());
    };
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read template {}", path.display()))?;
    MessageTemplate::parse(&source)
        .with_context(|| format!("Invalid template {}", path.display()))
}

/// Build the provider from the CLI arguments.
///
/// # Errors
/// Returns an error if the template or the HTTP client cannot be set up.
pub async fn provider(args: &Args) -> Result<VerifyProvider> {
    let template = load_template(args.template.as_ref()).await?;

    let tokens = JwtService::new(
        &args.secret,
        JwtConfig::new(args.issuer.clone())
            .with_session_ttl_seconds(args.session_ttl_seconds)
            .with_cookie_secure(args.cookie_secure),
    );

    let config = VerifyConfig::new(args.issuer.clone())
        .with_provider_name(args.provider_name.clone())
        .with_password(args.with_password)
        .with_gravatar(args.use_gravatar)
        .with_allowed_redirect_hosts(args.allowed_redirect_hosts.clone());

    VerifyProvider::new(config, Arc::new(tokens), Arc::new(LogSender), template)
}

/// Execute the server action.
/// # Errors
/// Returns an error if the provider cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let provider = provider(&args).await?;

    let result = conferma::new(args.port, Arc::new(provider)).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    info!(
        "Starting {} {} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        crate::GIT_COMMIT_HASH
    );
    debug!("Startup args: {:?}", args);
}
