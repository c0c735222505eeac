//! Token payload carried through every step of the confirmation flow.
//!
//! A claims value is never edited once built: each step of the handshake
//! creates a new one through [`Claims::confirmation`], [`Claims::credentials`]
//! or [`Claims::session`] and hands it straight to the token service.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use utoipa::ToSchema;

use super::error::VerifyError;

/// Joins the display name and the address inside a confirmation handshake ID.
pub const HANDSHAKE_SEPARATOR: &str = "::";

/// Lifetime of confirmation and credentials tokens.
pub const HANDSHAKE_TTL_SECONDS: i64 = 30 * 60;

/// `nbf` is backdated by this much to tolerate clock skew between nodes.
pub const CLOCK_SKEW_SECONDS: i64 = 60;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub picture: String,
}

impl User {
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            picture: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeState {
    /// Issued by the confirmation step, only good for resolving a login.
    Confirm,
    /// Issued after a confirmation when password mode is on.
    Credentials,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirm => f.write_str("confirm"),
            Self::Credentials => f.write_str("credentials"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub state: HandshakeState,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake: Option<Handshake>,
    #[serde(rename = "sess_only", default, skip_serializing_if = "is_false")]
    pub session_only: bool,
    #[serde(rename = "aud", default, skip_serializing_if = "String::is_empty")]
    pub audience: String,
    #[serde(rename = "iss", default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<i64>,
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl Claims {
    /// First step: the server challenges `handshake_id` (`user::address`).
    #[must_use]
    pub fn confirmation(
        handshake_id: String,
        from: Option<String>,
        audience: String,
        issuer: String,
        session_only: bool,
        now: i64,
    ) -> Self {
        Self {
            handshake: Some(Handshake {
                state: HandshakeState::Confirm,
                id: handshake_id,
                from,
            }),
            session_only,
            audience,
            issuer,
            not_before: Some(now - CLOCK_SKEW_SECONDS),
            expires_at: Some(now + HANDSHAKE_TTL_SECONDS),
            issued_at: Some(now),
            ..Self::default()
        }
    }

    /// Confirmation succeeded, a password step is still pending.
    #[must_use]
    pub fn credentials(
        user: User,
        handshake_id: String,
        audience: String,
        issuer: String,
        session_only: bool,
        now: i64,
    ) -> Self {
        Self {
            user: Some(user),
            handshake: Some(Handshake {
                state: HandshakeState::Credentials,
                id: handshake_id,
                from: None,
            }),
            session_only,
            audience,
            issuer,
            not_before: Some(now - CLOCK_SKEW_SECONDS),
            expires_at: Some(now + HANDSHAKE_TTL_SECONDS),
            issued_at: Some(now),
            ..Self::default()
        }
    }

    /// Final session claims. The validity window is filled in by the token
    /// service when the session cookie is set.
    #[must_use]
    pub fn session(
        user: User,
        audience: String,
        issuer: String,
        token_id: String,
        session_only: bool,
    ) -> Self {
        Self {
            user: Some(user),
            session_only,
            audience,
            issuer,
            token_id: Some(token_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn handshake_state(&self) -> Option<HandshakeState> {
        self.handshake.as_ref().map(|handshake| handshake.state)
    }

    /// A session credential carries a user and no handshake.
    #[must_use]
    pub fn is_session(&self) -> bool {
        self.handshake.is_none() && self.user.is_some()
    }
}

/// Build the confirmation handshake ID from sanitized fields.
#[must_use]
pub fn join_handshake_id(user: &str, address: &str) -> String {
    format!("{user}{HANDSHAKE_SEPARATOR}{address}")
}

/// Split a confirmation handshake ID back into `(user, address)`.
///
/// # Errors
///
/// Returns [`VerifyError::MalformedHandshake`] unless the ID holds exactly one
/// separator.
pub fn split_handshake_id(id: &str) -> Result<(&str, &str), VerifyError> {
    let mut parts = id.split(HANDSHAKE_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(address), None) => Ok((user, address)),
        _ => Err(VerifyError::MalformedHandshake),
    }
}

/// Stable user ID for an address: `<provider>_<sha1 hex>`.
#[must_use]
pub fn hash_id(provider: &str, address: &str) -> String {
    format!("{provider}_{:x}", Sha1::digest(address.as_bytes()))
}

#[must_use]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
