//! The confirmation flow: issue a challenge, resolve it into an identity,
//! optionally finalize a password step, and tear sessions down.
//!
//! Nothing here keeps state between requests. Every step is carried by a
//! signed token, so the provider is shared read-only behind an `Arc`.

use anyhow::{Context, Result};
use axum::{http::HeaderMap, response::IntoResponse, response::Response};
use rand::{rngs::OsRng, RngCore};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::sync::Arc;
use url::Url;
use utoipa::{IntoParams, ToSchema};

use super::{
    avatar::{gravatar_lookup, valid_email, AVATAR_TIMEOUT, GRAVATAR_BASE_URL},
    claims::{
        hash_id, join_handshake_id, now_unix, split_handshake_id, Claims, Handshake,
        HandshakeState, User,
    },
    error::VerifyError,
    logger::{Logger, TracingLogger},
    sanitize::sanitize,
    sender::Sender,
    template::{MessageData, MessageTemplate},
    token::{TokenError, TokenService},
    users::{AvatarSaver, PasswordChecker, UserSaver},
};

pub const DEFAULT_PROVIDER_NAME: &str = "email";

#[derive(Clone, Debug)]
pub struct VerifyConfig {
    provider_name: String,
    issuer: String,
    with_password: bool,
    use_gravatar: bool,
    gravatar_base_url: String,
    allowed_redirect_hosts: Vec<String>,
}

impl VerifyConfig {
    #[must_use]
    pub fn new(issuer: String) -> Self {
        Self {
            provider_name: DEFAULT_PROVIDER_NAME.to_string(),
            issuer,
            with_password: false,
            use_gravatar: false,
            gravatar_base_url: GRAVATAR_BASE_URL.to_string(),
            allowed_redirect_hosts: Vec::new(),
        }
    }

    /// Prefix of every derived user ID.
    #[must_use]
    pub fn with_provider_name(mut self, name: String) -> Self {
        self.provider_name = name;
        self
    }

    /// Require a password step after the confirmation.
    #[must_use]
    pub fn with_password(mut self, enabled: bool) -> Self {
        self.with_password = enabled;
        self
    }

    #[must_use]
    pub fn with_gravatar(mut self, enabled: bool) -> Self {
        self.use_gravatar = enabled;
        self
    }

    #[must_use]
    pub fn with_gravatar_base_url(mut self, url: String) -> Self {
        self.gravatar_base_url = url;
        self
    }

    /// Hosts a successful login may redirect back to.
    #[must_use]
    pub fn with_allowed_redirect_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed_redirect_hosts = hosts;
        self
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn password_mode(&self) -> bool {
        self.with_password
    }

    #[must_use]
    pub fn use_gravatar(&self) -> bool {
        self.use_gravatar
    }

    #[must_use]
    pub fn gravatar_base_url(&self) -> &str {
        &self.gravatar_base_url
    }

    #[must_use]
    pub fn allowed_redirect_hosts(&self) -> &[String] {
        &self.allowed_redirect_hosts
    }
}

/// Raw login parameters as they arrive on the query string.
#[derive(IntoParams, Debug, Clone, Default, Deserialize)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Confirmation token from the delivered message.
    pub token: Option<String>,
    pub user: Option<String>,
    pub address: Option<String>,
    /// Audience recorded in the tokens.
    pub site: Option<String>,
    /// Any non-empty value other than `0` makes the session cookie ephemeral.
    pub session: Option<String>,
    /// Where to send the browser once logged in.
    pub from: Option<String>,
}

impl LoginQuery {
    #[must_use]
    pub fn session_only(&self) -> bool {
        session_flag(self.session.as_deref())
    }

    fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    fn confirmation_request(&self) -> ConfirmationRequest {
        ConfirmationRequest {
            user: self.user.clone().unwrap_or_default(),
            address: self.address.clone().unwrap_or_default(),
            site: self.site.clone().unwrap_or_default(),
            from: self.from.clone().filter(|from| !from.trim().is_empty()),
            session_only: self.session_only(),
        }
    }
}

#[must_use]
pub fn session_flag(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty() && value != "0")
}

#[derive(Debug, Clone, Default)]
pub struct ConfirmationRequest {
    pub user: String,
    pub address: String,
    pub site: String,
    pub from: Option<String>,
    pub session_only: bool,
}

/// Returned when a confirmation was sent. The token itself is never echoed.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment {
    pub user: String,
    pub address: String,
}

/// A freshly issued session: the user and the cookie that carries it.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub cookies: HeaderMap,
    pub redirect: Option<String>,
}

#[derive(Debug)]
pub enum LoginOutcome {
    ConfirmationSent(Acknowledgment),
    /// Confirmation accepted, the password step is pending.
    Confirmed { cookies: HeaderMap },
    Authenticated(Session),
}

pub struct VerifyProvider {
    config: VerifyConfig,
    tokens: Arc<dyn TokenService>,
    sender: Arc<dyn Sender>,
    template: MessageTemplate,
    user_saver: Option<Arc<dyn UserSaver>>,
    avatar_saver: Option<Arc<dyn AvatarSaver>>,
    password_checker: Option<Arc<dyn PasswordChecker>>,
    logger: Arc<dyn Logger>,
    client: Client,
}

impl VerifyProvider {
    /// # Errors
    ///
    /// Returns an error if the avatar HTTP client cannot be built.
    pub fn new(
        config: VerifyConfig,
        tokens: Arc<dyn TokenService>,
        sender: Arc<dyn Sender>,
        template: MessageTemplate,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(AVATAR_TIMEOUT)
            .build()
            .context("Failed to build avatar HTTP client")?;

        Ok(Self {
            config,
            tokens,
            sender,
            template,
            user_saver: None,
            avatar_saver: None,
            password_checker: None,
            logger: Arc::new(TracingLogger),
            client,
        })
    }

    #[must_use]
    pub fn with_user_saver(mut self, saver: Arc<dyn UserSaver>) -> Self {
        self.user_saver = Some(saver);
        self
    }

    #[must_use]
    pub fn with_avatar_saver(mut self, saver: Arc<dyn AvatarSaver>) -> Self {
        self.avatar_saver = Some(saver);
        self
    }

    #[must_use]
    pub fn with_password_checker(mut self, checker: Arc<dyn PasswordChecker>) -> Self {
        self.password_checker = Some(checker);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Entry point for `GET /login`: without a token a confirmation is sent,
    /// with one the confirmation is resolved.
    ///
    /// # Errors
    ///
    /// See [`Self::request_confirmation`] and [`Self::resolve_login`].
    pub async fn login(&self, query: &LoginQuery) -> Result<LoginOutcome, VerifyError> {
        match query.token() {
            None => {
                let ack = self
                    .request_confirmation(&query.confirmation_request())
                    .await?;
                Ok(LoginOutcome::ConfirmationSent(ack))
            }
            Some(token) => {
                self.resolve_login(token, query.site.as_deref(), query.session_only())
                    .await
            }
        }
    }

    /// Sign a "confirm" token for `user::address` and deliver it.
    ///
    /// # Errors
    ///
    /// [`VerifyError::Validation`] for an empty user or address or a
    /// redirect target that is not allowed, then signing, template and
    /// delivery failures.
    pub async fn request_confirmation(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<Acknowledgment, VerifyError> {
        let user = sanitize(&request.user);
        let address = sanitize(&request.address);
        if user.is_empty() || address.is_empty() {
            return Err(VerifyError::Validation(
                "can't get user and address".to_string(),
            ));
        }
        let from = request
            .from
            .as_deref()
            .map(|from| self.validate_redirect(from))
            .transpose()?;
        let site = sanitize(&request.site);

        let claims = Claims::confirmation(
            join_handshake_id(&user, &address),
            from,
            site.clone(),
            self.config.issuer().to_string(),
            request.session_only,
            now_unix(),
        );
        let token = self
            .tokens
            .token(&claims)
            .map_err(VerifyError::TokenSigning)?;

        let message = self.template.render(&MessageData {
            user: &user,
            address: &address,
            token: &token,
            site: &site,
        })?;
        self.deliver(address.clone(), message).await?;
        self.logger
            .debug(&format!("confirmation sent for site {site:?}"));

        Ok(Acknowledgment { user, address })
    }

    /// Turn a confirmation token into either a pending credentials token
    /// (password mode) or a final session.
    ///
    /// # Errors
    ///
    /// Token failures are reported as [`VerifyError::InvalidToken`],
    /// [`VerifyError::ExpiredToken`], [`VerifyError::InvalidState`] or
    /// [`VerifyError::MalformedHandshake`]; collaborator failures keep their
    /// own variants.
    pub async fn resolve_login(
        &self,
        token: &str,
        site: Option<&str>,
        session_only: bool,
    ) -> Result<LoginOutcome, VerifyError> {
        let confirmation = self.tokens.parse(token).map_err(VerifyError::InvalidToken)?;
        if self.tokens.is_expired(&confirmation) {
            return Err(VerifyError::ExpiredToken);
        }
        let handshake = confirm_handshake(&confirmation)?;
        let (name, address) = split_handshake_id(&handshake.id)?;
        let user = User::new(name, hash_id(self.config.provider_name(), address));

        if self.config.password_mode() {
            let audience = site
                .map(sanitize)
                .filter(|site| !site.is_empty())
                .unwrap_or_else(|| confirmation.audience.clone());
            let claims = Claims::credentials(
                user,
                handshake.id.clone(),
                audience,
                self.config.issuer().to_string(),
                session_only,
                now_unix(),
            );
            let mut cookies = HeaderMap::new();
            self.tokens
                .set(&mut cookies, claims)
                .map_err(VerifyError::TokenSigning)?;
            return Ok(LoginOutcome::Confirmed { cookies });
        }

        let user = self.attach_avatar(user, address).await?;
        self.save_user(&user).await?;
        let mut session = self.issue_session(user, confirmation.audience.clone(), session_only)?;
        session.redirect.clone_from(&handshake.from);
        Ok(LoginOutcome::Authenticated(session))
    }

    /// Complete the password step started by [`Self::resolve_login`].
    ///
    /// # Errors
    ///
    /// [`VerifyError::InvalidState`] when password mode is off or the
    /// request carries no credentials token, token and password check
    /// failures, then persistence and signing failures.
    pub async fn finalize_credentials(
        &self,
        headers: &HeaderMap,
        session_only: bool,
        password: Option<SecretString>,
    ) -> Result<Session, VerifyError> {
        if !self.config.password_mode() {
            return Err(VerifyError::InvalidState(
                "password mode is disabled".to_string(),
            ));
        }
        let claims = match self.tokens.get(headers) {
            Ok((claims, _)) => claims,
            Err(TokenError::Missing) => {
                return Err(VerifyError::InvalidState(
                    "no credentials token".to_string(),
                ))
            }
            Err(TokenError::Expired) => return Err(VerifyError::ExpiredToken),
            Err(err) => return Err(VerifyError::InvalidToken(err)),
        };
        match claims.handshake_state() {
            Some(HandshakeState::Credentials) => {}
            Some(state) => {
                return Err(VerifyError::InvalidState(format!(
                    "expected credentials handshake, got {state}"
                )))
            }
            None => {
                return Err(VerifyError::InvalidState(
                    "expected credentials handshake".to_string(),
                ))
            }
        }
        let user = claims.user.clone().ok_or_else(|| {
            VerifyError::InvalidState("credentials token without user".to_string())
        })?;

        self.check_password(&user, password).await?;
        self.save_user(&user).await?;
        self.issue_session(user, claims.audience, session_only)
    }

    /// Headers that clear the session cookie. Never fails.
    #[must_use]
    pub fn logout(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.tokens.reset(&mut headers);
        headers
    }

    /// The user behind the session presented with a request.
    ///
    /// # Errors
    ///
    /// [`VerifyError::NoSession`] when nothing is presented, token failures
    /// otherwise. Handshake tokens are never sessions.
    pub fn current_user(&self, headers: &HeaderMap) -> Result<User, VerifyError> {
        let (claims, _) = self.tokens.get(headers).map_err(|err| match err {
            TokenError::Missing => VerifyError::NoSession,
            TokenError::Expired => VerifyError::ExpiredToken,
            other => VerifyError::InvalidToken(other),
        })?;
        if let Some(state) = claims.handshake_state() {
            return Err(VerifyError::InvalidState(format!(
                "{state} token is not a session"
            )));
        }
        claims.user.ok_or(VerifyError::NoSession)
    }

    /// Log the failure through the injected logger and render it.
    pub fn reject(&self, err: VerifyError) -> Response {
        let message = format!("{}: {err}", err.status());
        if err.is_internal() {
            self.logger.error(&message);
        } else {
            self.logger.warn(&message);
        }
        err.into_response()
    }

    fn validate_redirect(&self, from: &str) -> Result<String, VerifyError> {
        let invalid = || VerifyError::Validation("invalid redirect target".to_string());
        let url = Url::parse(from.trim()).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        let host = url.host_str().ok_or_else(invalid)?;
        if !self
            .config
            .allowed_redirect_hosts()
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(host))
        {
            return Err(invalid());
        }
        Ok(url.to_string())
    }

    async fn deliver(&self, address: String, message: String) -> Result<(), VerifyError> {
        let sender = Arc::clone(&self.sender);
        tokio::task::spawn_blocking(move || sender.send(&address, &message))
            .await
            .map_err(|err| VerifyError::Delivery(err.into()))?
            .map_err(VerifyError::Delivery)
    }

    async fn attach_avatar(&self, mut user: User, address: &str) -> Result<User, VerifyError> {
        if self.config.use_gravatar() && valid_email(address) {
            match gravatar_lookup(&self.client, self.config.gravatar_base_url(), address).await {
                Ok(picture) => user.picture = picture,
                Err(err) => self
                    .logger
                    .debug(&format!("no gravatar for {}: {err:#}", user.id)),
            }
        }
        match &self.avatar_saver {
            Some(saver) => saver
                .save(user, &self.client)
                .await
                .map_err(VerifyError::AvatarPersist),
            None => Ok(user),
        }
    }

    async fn save_user(&self, user: &User) -> Result<(), VerifyError> {
        if let Some(saver) = &self.user_saver {
            saver.save(user).await.map_err(VerifyError::UserPersist)?;
        }
        Ok(())
    }

    async fn check_password(
        &self,
        user: &User,
        password: Option<SecretString>,
    ) -> Result<(), VerifyError> {
        let Some(checker) = &self.password_checker else {
            return Ok(());
        };
        let password = password
            .filter(|password| !password.expose_secret().is_empty())
            .ok_or_else(|| VerifyError::Validation("missing password".to_string()))?;
        match checker.check(user, &password).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(VerifyError::InvalidCredentials),
            Err(err) => Err(VerifyError::CredentialCheck(err)),
        }
    }

    fn issue_session(
        &self,
        user: User,
        audience: String,
        session_only: bool,
    ) -> Result<Session, VerifyError> {
        let token_id = random_token_id().map_err(VerifyError::IdGeneration)?;
        let claims = Claims::session(
            user.clone(),
            audience,
            self.config.issuer().to_string(),
            token_id,
            session_only,
        );
        let mut cookies = HeaderMap::new();
        self.tokens
            .set(&mut cookies, claims)
            .map_err(VerifyError::TokenSigning)?;
        Ok(Session {
            user,
            cookies,
            redirect: None,
        })
    }
}

fn confirm_handshake(claims: &Claims) -> Result<&Handshake, VerifyError> {
    match &claims.handshake {
        Some(handshake) if handshake.state == HandshakeState::Confirm => Ok(handshake),
        Some(handshake) => Err(VerifyError::InvalidState(format!(
            "expected confirm handshake, got {}",
            handshake.state
        ))),
        None => Err(VerifyError::InvalidState(
            "token has no handshake".to_string(),
        )),
    }
}

/// 32 bytes from the OS RNG, SHA-1 hex encoded.
///
/// # Errors
///
/// Returns an error if the OS RNG is unavailable.
pub fn random_token_id() -> Result<String, rand::Error> {
    let mut bytes = [0u8; 32];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(format!("{:x}", Sha1::digest(bytes)))
}
