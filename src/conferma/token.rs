//! Token service contract and the default HS256 JWT implementation.
//!
//! The confirmation flow only talks to [`TokenService`]; signing keys, cookie
//! layout and header lookup stay behind it.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashSet;
use thiserror::Error;

use super::claims::{now_unix, Claims, CLOCK_SKEW_SECONDS};

pub const DEFAULT_COOKIE_NAME: &str = "JWT";
pub const JWT_HEADER: &str = "x-jwt";
const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no token in request")]
    Missing,
    #[error("token expired")]
    Expired,
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid cookie value")]
    Cookie(#[from] InvalidHeaderValue),
}

/// Signing, verification and session-cookie management.
pub trait TokenService: Send + Sync {
    /// Sign claims into a token string.
    fn token(&self, claims: &Claims) -> Result<String, TokenError>;

    /// Verify signature, issuer and `nbf`. Expiry is left to [`Self::is_expired`].
    fn parse(&self, token: &str) -> Result<Claims, TokenError>;

    fn is_expired(&self, claims: &Claims) -> bool;

    /// Sign claims and append the session cookie to `headers`.
    fn set(&self, headers: &mut HeaderMap, claims: Claims) -> Result<Claims, TokenError>;

    /// Read and verify the token presented with a request.
    fn get(&self, headers: &HeaderMap) -> Result<(Claims, String), TokenError>;

    /// Append a cookie that clears the session.
    fn reset(&self, headers: &mut HeaderMap);
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    issuer: String,
    cookie_name: String,
    session_ttl_seconds: i64,
    cookie_secure: bool,
}

impl JwtConfig {
    #[must_use]
    pub fn new(issuer: String) -> Self {
        Self {
            issuer,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        self.cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

pub struct JwtService {
    config: JwtConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtService {
    #[must_use]
    pub fn new(secret: &SecretString, config: JwtConfig) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer()]);
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    fn session_cookie(&self, token: &str, session_only: bool) -> Result<HeaderValue, TokenError> {
        let mut cookie = format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax",
            self.config.cookie_name()
        );
        // Session-only cookies die with the browser.
        if !session_only {
            cookie.push_str(&format!("; Max-Age={}", self.config.session_ttl_seconds()));
        }
        if self.config.cookie_secure() {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        if let Some(token) = header_value(headers, JWT_HEADER) {
            return Some(token);
        }
        if let Some(token) = extract_bearer_token(headers) {
            return Some(token);
        }
        extract_cookie(headers, self.config.cookie_name())
    }
}

impl TokenService for JwtService {
    fn token(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }

    fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        Ok(decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }

    fn is_expired(&self, claims: &Claims) -> bool {
        claims
            .expires_at
            .is_some_and(|expires_at| expires_at < now_unix())
    }

    fn set(&self, headers: &mut HeaderMap, mut claims: Claims) -> Result<Claims, TokenError> {
        let now = now_unix();
        claims.issued_at.get_or_insert(now);
        claims.not_before.get_or_insert(now - CLOCK_SKEW_SECONDS);
        claims
            .expires_at
            .get_or_insert(now + self.config.session_ttl_seconds());
        if claims.issuer.is_empty() {
            claims.issuer = self.config.issuer().to_string();
        }

        let token = self.token(&claims)?;
        headers.append(SET_COOKIE, self.session_cookie(&token, claims.session_only)?);
        Ok(claims)
    }

    fn get(&self, headers: &HeaderMap) -> Result<(Claims, String), TokenError> {
        let token = self.extract(headers).ok_or(TokenError::Missing)?;
        let claims = self.parse(&token)?;
        if self.is_expired(&claims) {
            return Err(TokenError::Expired);
        }
        Ok((claims, token))
    }

    fn reset(&self, headers: &mut HeaderMap) {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.config.cookie_name()
        );
        if self.config.cookie_secure() {
            cookie.push_str("; Secure");
        }
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(SET_COOKIE, value);
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}
