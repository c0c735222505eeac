//! Best-effort Gravatar lookup for confirmed email addresses.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{info_span, instrument, Instrument};

pub const GRAVATAR_BASE_URL: &str = "https://www.gravatar.com/avatar/";

/// Bounds every avatar request so a slow third party cannot stall a login.
pub const AVATAR_TIMEOUT: Duration = Duration::from_secs(5);

static EMAIL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Basic email format check, enough to avoid pointless Gravatar requests.
#[must_use]
pub fn valid_email(address: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(address))
}

#[must_use]
pub fn gravatar_url(base_url: &str, email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    format!("{base_url}{:x}", Sha256::digest(normalized.as_bytes()))
}

/// Return the Gravatar picture URL for `email` if one exists.
///
/// # Errors
///
/// Returns an error when the request fails or Gravatar has no picture.
#[instrument(skip(client, email))]
pub async fn gravatar_lookup(client: &Client, base_url: &str, email: &str) -> Result<String> {
    let url = gravatar_url(base_url, email);
    let span = info_span!("http.client", http.method = "GET", url = %url);
    let response = client
        .get(format!("{url}?d=404&s=80"))
        .send()
        .instrument(span)
        .await
        .context("gravatar request failed")?;

    if response.status() != StatusCode::OK {
        bail!("gravatar returned {}", response.status());
    }

    Ok(url)
}
