use super::{
    avatar::gravatar_url,
    claims::{hash_id, join_handshake_id, now_unix, Claims, HandshakeState, User},
    error::VerifyError,
    logger::tests::RecordingLogger,
    provider::{
        random_token_id, session_flag, ConfirmationRequest, LoginOutcome, LoginQuery, Session,
        VerifyConfig, VerifyProvider,
    },
    sender::tests::RecordingSender,
    template::MessageTemplate,
    token::{
        tests::{cookie_request, jwt_service},
        JwtService, TokenError, TokenService, JWT_HEADER,
    },
    users::{AvatarSaver, PasswordChecker, UserSaver},
};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Router,
};
use jsonwebtoken::errors::ErrorKind;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::Level;

const ISSUER: &str = "conferma";

fn config() -> VerifyConfig {
    VerifyConfig::new(ISSUER.to_string())
}

fn provider(config: VerifyConfig) -> Result<(VerifyProvider, Arc<RecordingSender>)> {
    let sender = Arc::new(RecordingSender::default());
    let provider = VerifyProvider::new(
        config,
        Arc::new(jwt_service()),
        sender.clone(),
        MessageTemplate::default(),
    )?;
    Ok((provider, sender))
}

fn ann_request() -> ConfirmationRequest {
    ConfirmationRequest {
        user: "ann".to_string(),
        address: "ann@example.com".to_string(),
        site: "s1".to_string(),
        ..ConfirmationRequest::default()
    }
}

fn sent_token(sender: &RecordingSender) -> Result<String> {
    let (_, text) = sender.sent().pop().context("nothing was sent")?;
    text.lines()
        .find_map(|line| line.strip_prefix("Token: "))
        .map(str::to_string)
        .context("no token in message")
}

fn expect_session(outcome: LoginOutcome) -> Result<Session> {
    match outcome {
        LoginOutcome::Authenticated(session) => Ok(session),
        other => bail!("expected a session, got {other:?}"),
    }
}

fn expect_pending(outcome: LoginOutcome) -> Result<HeaderMap> {
    match outcome {
        LoginOutcome::Confirmed { cookies } => Ok(cookies),
        other => bail!("expected a pending credentials step, got {other:?}"),
    }
}

fn jwt_header(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(JWT_HEADER, HeaderValue::from_str(token)?);
    Ok(headers)
}

#[derive(Default)]
struct MemoryUsers {
    saved: Mutex<Vec<User>>,
}

impl MemoryUsers {
    fn saved(&self) -> Vec<User> {
        self.saved.lock().map(|saved| saved.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl UserSaver for MemoryUsers {
    async fn save(&self, user: &User) -> Result<()> {
        self.saved
            .lock()
            .map_err(|_| anyhow!("lock poisoned"))?
            .push(user.clone());
        Ok(())
    }
}

struct BrokenUsers;

#[async_trait]
impl UserSaver for BrokenUsers {
    async fn save(&self, _user: &User) -> Result<()> {
        Err(anyhow!("database unavailable"))
    }
}

struct ProxyAvatars;

#[async_trait]
impl AvatarSaver for ProxyAvatars {
    async fn save(&self, mut user: User, _client: &Client) -> Result<User> {
        user.picture = format!("https://avatars.example.com/{}", user.id);
        Ok(user)
    }
}

struct BrokenAvatars;

#[async_trait]
impl AvatarSaver for BrokenAvatars {
    async fn save(&self, _user: User, _client: &Client) -> Result<User> {
        Err(anyhow!("proxy down"))
    }
}

/// Verifies like the real service but cannot sign anything.
struct UnsignableTokens(JwtService);

impl UnsignableTokens {
    fn new() -> Self {
        Self(jwt_service())
    }

    fn signing_error() -> TokenError {
        TokenError::Jwt(ErrorKind::InvalidKeyFormat.into())
    }
}

impl TokenService for UnsignableTokens {
    fn token(&self, _claims: &Claims) -> Result<String, TokenError> {
        Err(Self::signing_error())
    }

    fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        self.0.parse(token)
    }

    fn is_expired(&self, claims: &Claims) -> bool {
        self.0.is_expired(claims)
    }

    fn set(&self, _headers: &mut HeaderMap, _claims: Claims) -> Result<Claims, TokenError> {
        Err(Self::signing_error())
    }

    fn get(&self, headers: &HeaderMap) -> Result<(Claims, String), TokenError> {
        self.0.get(headers)
    }

    fn reset(&self, headers: &mut HeaderMap) {
        self.0.reset(headers);
    }
}

fn confirm_token() -> Result<String> {
    let claims = Claims::confirmation(
        join_handshake_id("ann", "ann@example.com"),
        None,
        "s1".to_string(),
        ISSUER.to_string(),
        false,
        now_unix(),
    );
    Ok(jwt_service().token(&claims)?)
}

struct FixedPassword(&'static str);

#[async_trait]
impl PasswordChecker for FixedPassword {
    async fn check(&self, _user: &User, password: &SecretString) -> Result<bool> {
        Ok(password.expose_secret() == self.0)
    }
}

struct BrokenChecker;

#[async_trait]
impl PasswordChecker for BrokenChecker {
    async fn check(&self, _user: &User, _password: &SecretString) -> Result<bool> {
        Err(anyhow!("directory timeout"))
    }
}

#[tokio::test]
async fn confirmation_is_sent_for_ann() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let ack = provider.request_confirmation(&ann_request()).await?;
    assert_eq!(ack.user, "ann");
    assert_eq!(ack.address, "ann@example.com");

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ann@example.com");
    assert!(sent[0].1.contains("ann"));

    let claims = jwt_service().parse(&sent_token(&sender)?)?;
    assert_eq!(claims.handshake_state(), Some(HandshakeState::Confirm));
    let handshake = claims.handshake.context("missing handshake")?;
    assert_eq!(handshake.id, "ann::ann@example.com");
    assert_eq!(claims.audience, "s1");
    assert_eq!(claims.issuer, ISSUER);
    assert!(claims.user.is_none());
    Ok(())
}

#[tokio::test]
async fn empty_address_sends_nothing() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let request = ConfirmationRequest {
        address: "   ".to_string(),
        ..ann_request()
    };
    let result = provider.request_confirmation(&request).await;
    assert!(matches!(result, Err(VerifyError::Validation(_))));
    assert!(sender.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn markup_cannot_inject_a_separator() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let request = ConfirmationRequest {
        user: "<b>ann</b>::admin".to_string(),
        ..ann_request()
    };
    let ack = provider.request_confirmation(&request).await?;
    assert!(!ack.user.contains("::"));

    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    let session = expect_session(outcome)?;
    assert_eq!(session.user.id, hash_id("email", "ann@example.com"));
    Ok(())
}

#[tokio::test]
async fn failed_delivery_is_reported() -> Result<()> {
    let sender = |_: &str, _: &str| -> Result<()> { Err(anyhow!("mailbox full")) };
    let provider = VerifyProvider::new(
        config(),
        Arc::new(jwt_service()),
        Arc::new(sender),
        MessageTemplate::default(),
    )?;
    let result = provider.request_confirmation(&ann_request()).await;
    assert!(matches!(result, Err(VerifyError::Delivery(_))));
    Ok(())
}

#[tokio::test]
async fn login_without_token_requests_confirmation() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let query = LoginQuery {
        user: Some("ann".to_string()),
        address: Some("ann@example.com".to_string()),
        site: Some("s1".to_string()),
        token: Some(String::new()),
        ..LoginQuery::default()
    };
    match provider.login(&query).await? {
        LoginOutcome::ConfirmationSent(ack) => assert_eq!(ack.address, "ann@example.com"),
        other => bail!("unexpected outcome {other:?}"),
    }
    assert_eq!(sender.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn confirmed_login_issues_session() -> Result<()> {
    let (provider, sender) = provider(config())?;
    provider.request_confirmation(&ann_request()).await?;
    let query = LoginQuery {
        token: Some(sent_token(&sender)?),
        ..LoginQuery::default()
    };
    let session = expect_session(provider.login(&query).await?)?;
    assert_eq!(session.user.name, "ann");
    assert_eq!(session.user.id, hash_id("email", "ann@example.com"));
    assert!(session.redirect.is_none());

    let (claims, _) = jwt_service().get(&cookie_request(&session.cookies)?)?;
    assert!(claims.is_session());
    assert_eq!(claims.audience, "s1");
    assert!(claims.token_id.is_some());
    assert!(claims.expires_at.is_some());

    let user = provider.current_user(&cookie_request(&session.cookies)?)?;
    assert_eq!(user, session.user);
    Ok(())
}

#[tokio::test]
async fn derived_id_is_stable_across_logins() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let mut ids = Vec::new();
    for _ in 0..2 {
        provider.request_confirmation(&ann_request()).await?;
        let outcome = provider
            .resolve_login(&sent_token(&sender)?, None, false)
            .await?;
        ids.push(expect_session(outcome)?.user.id);
    }
    assert_eq!(ids[0], ids[1]);
    Ok(())
}

#[tokio::test]
async fn expired_confirmation_is_rejected() -> Result<()> {
    let (provider, _) = provider(config())?;
    let claims = Claims::confirmation(
        join_handshake_id("ann", "ann@example.com"),
        None,
        "s1".to_string(),
        ISSUER.to_string(),
        false,
        now_unix() - 3 * 3600,
    );
    let token = jwt_service().token(&claims)?;
    let result = provider.resolve_login(&token, None, false).await;
    assert!(matches!(result, Err(VerifyError::ExpiredToken)));
    Ok(())
}

#[tokio::test]
async fn forged_token_is_rejected() -> Result<()> {
    let (provider, sender) = provider(config())?;
    provider.request_confirmation(&ann_request()).await?;
    let mut token = sent_token(&sender)?;
    token.push('x');
    let result = provider.resolve_login(&token, None, false).await;
    assert!(matches!(result, Err(VerifyError::InvalidToken(_))));
    Ok(())
}

#[tokio::test]
async fn handshake_needs_exactly_one_separator() -> Result<()> {
    let (provider, _) = provider(config())?;
    for id in ["ann-ann@example.com", "ann::x::ann@example.com"] {
        let claims = Claims::confirmation(
            id.to_string(),
            None,
            "s1".to_string(),
            ISSUER.to_string(),
            false,
            now_unix(),
        );
        let token = jwt_service().token(&claims)?;
        let result = provider.resolve_login(&token, None, false).await;
        assert!(
            matches!(result, Err(VerifyError::MalformedHandshake)),
            "{id} should be malformed"
        );
    }
    Ok(())
}

#[tokio::test]
async fn login_only_accepts_confirm_tokens() -> Result<()> {
    let (provider, _) = provider(config())?;
    let service = jwt_service();
    let credentials = Claims::credentials(
        User::new("ann", hash_id("email", "ann@example.com")),
        join_handshake_id("ann", "ann@example.com"),
        "s1".to_string(),
        ISSUER.to_string(),
        false,
        now_unix(),
    );
    let session = Claims::session(
        User::new("ann", hash_id("email", "ann@example.com")),
        "s1".to_string(),
        ISSUER.to_string(),
        random_token_id()?,
        false,
    );
    for claims in [credentials, session] {
        let token = service.token(&claims)?;
        let result = provider.resolve_login(&token, None, false).await;
        assert!(matches!(result, Err(VerifyError::InvalidState(_))));
    }
    Ok(())
}

#[tokio::test]
async fn password_mode_requires_finalize() -> Result<()> {
    let (provider, sender) = provider(config().with_password(true))?;
    let users = Arc::new(MemoryUsers::default());
    let provider = provider.with_user_saver(users.clone());

    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, Some("s2"), true)
        .await?;
    let pending = cookie_request(&expect_pending(outcome)?)?;
    assert!(users.saved().is_empty());

    let (claims, _) = jwt_service().get(&pending)?;
    assert_eq!(claims.handshake_state(), Some(HandshakeState::Credentials));
    assert_eq!(claims.audience, "s2");
    assert!(claims.session_only);

    // A pending credentials token is not a session.
    assert!(matches!(
        provider.current_user(&pending),
        Err(VerifyError::InvalidState(_))
    ));

    let session = provider.finalize_credentials(&pending, false, None).await?;
    assert_eq!(session.user.id, hash_id("email", "ann@example.com"));
    assert_eq!(users.saved(), vec![session.user.clone()]);

    let (final_claims, _) = jwt_service().get(&cookie_request(&session.cookies)?)?;
    assert!(final_claims.is_session());
    assert_eq!(final_claims.audience, "s2");
    Ok(())
}

#[tokio::test]
async fn same_id_through_the_whole_chain() -> Result<()> {
    let (provider, sender) = provider(config().with_password(true))?;
    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    let pending = cookie_request(&expect_pending(outcome)?)?;
    let (credentials, _) = jwt_service().get(&pending)?;
    let session = provider.finalize_credentials(&pending, false, None).await?;
    let expected = hash_id("email", "ann@example.com");

    assert_eq!(
        credentials.user.map(|user| user.id),
        Some(expected.clone())
    );
    assert_eq!(session.user.id, expected);
    assert_eq!(
        provider.current_user(&cookie_request(&session.cookies)?)?.id,
        expected
    );
    Ok(())
}

#[tokio::test]
async fn finalize_rejects_missing_or_wrong_tokens() -> Result<()> {
    let (provider, sender) = provider(config().with_password(true))?;

    let missing = provider
        .finalize_credentials(&HeaderMap::new(), false, None)
        .await;
    assert!(matches!(missing, Err(VerifyError::InvalidState(_))));

    provider.request_confirmation(&ann_request()).await?;
    let confirm = jwt_header(&sent_token(&sender)?)?;
    let wrong_state = provider.finalize_credentials(&confirm, false, None).await;
    assert!(matches!(wrong_state, Err(VerifyError::InvalidState(_))));

    let forged = provider
        .finalize_credentials(&jwt_header("a.b.c")?, false, None)
        .await;
    assert!(matches!(forged, Err(VerifyError::InvalidToken(_))));
    Ok(())
}

#[tokio::test]
async fn finalize_requires_password_mode() -> Result<()> {
    let (provider, sender) = provider(config())?;
    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    let session = expect_session(outcome)?;
    let result = provider
        .finalize_credentials(&cookie_request(&session.cookies)?, false, None)
        .await;
    assert!(matches!(result, Err(VerifyError::InvalidState(_))));
    Ok(())
}

#[tokio::test]
async fn password_checker_gates_the_session() -> Result<()> {
    let (provider, sender) = provider(config().with_password(true))?;
    let provider = provider.with_password_checker(Arc::new(FixedPassword("hunter2")));
    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    let pending = cookie_request(&expect_pending(outcome)?)?;

    let missing = provider.finalize_credentials(&pending, false, None).await;
    assert!(matches!(missing, Err(VerifyError::Validation(_))));

    let wrong = provider
        .finalize_credentials(&pending, false, Some(SecretString::from("guess")))
        .await;
    let err = wrong.err().context("wrong password accepted")?;
    assert!(matches!(err, VerifyError::InvalidCredentials));
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let session = provider
        .finalize_credentials(&pending, false, Some(SecretString::from("hunter2")))
        .await?;
    assert_eq!(session.user.name, "ann");
    Ok(())
}

#[tokio::test]
async fn checker_failure_is_internal() -> Result<()> {
    let (provider, sender) = provider(config().with_password(true))?;
    let provider = provider.with_password_checker(Arc::new(BrokenChecker));
    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    let pending = cookie_request(&expect_pending(outcome)?)?;
    let err = provider
        .finalize_credentials(&pending, false, Some(SecretString::from("x")))
        .await
        .err()
        .context("broken checker accepted")?;
    assert!(matches!(err, VerifyError::CredentialCheck(_)));
    assert!(err.is_internal());
    Ok(())
}

#[tokio::test]
async fn savers_run_on_final_login() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let users = Arc::new(MemoryUsers::default());
    let provider = provider
        .with_user_saver(users.clone())
        .with_avatar_saver(Arc::new(ProxyAvatars));
    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    let session = expect_session(outcome)?;
    assert!(session.user.picture.starts_with("https://avatars.example.com/email_"));
    assert_eq!(users.saved(), vec![session.user]);
    Ok(())
}

#[tokio::test]
async fn user_saver_failure_aborts_login() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let provider = provider.with_user_saver(Arc::new(BrokenUsers));
    provider.request_confirmation(&ann_request()).await?;
    let result = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await;
    assert!(matches!(result, Err(VerifyError::UserPersist(_))));
    Ok(())
}

#[tokio::test]
async fn avatar_saver_failure_aborts_login() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let users = Arc::new(MemoryUsers::default());
    let provider = provider
        .with_user_saver(users.clone())
        .with_avatar_saver(Arc::new(BrokenAvatars));
    provider.request_confirmation(&ann_request()).await?;
    let err = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await
        .err()
        .context("broken avatar saver accepted")?;
    assert!(matches!(err, VerifyError::AvatarPersist(_)));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(users.saved().is_empty());
    Ok(())
}

#[tokio::test]
async fn signing_failure_stops_confirmation() -> Result<()> {
    let sender = Arc::new(RecordingSender::default());
    let provider = VerifyProvider::new(
        config(),
        Arc::new(UnsignableTokens::new()),
        sender.clone(),
        MessageTemplate::default(),
    )?;
    let err = provider
        .request_confirmation(&ann_request())
        .await
        .err()
        .context("unsigned confirmation sent")?;
    assert!(matches!(err, VerifyError::TokenSigning(_)));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(sender.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn signing_failure_stops_both_login_branches() -> Result<()> {
    for password_mode in [false, true] {
        let provider = VerifyProvider::new(
            config().with_password(password_mode),
            Arc::new(UnsignableTokens::new()),
            Arc::new(RecordingSender::default()),
            MessageTemplate::default(),
        )?;
        let err = provider
            .resolve_login(&confirm_token()?, None, false)
            .await
            .err()
            .context("login succeeded without signing")?;
        assert!(
            matches!(err, VerifyError::TokenSigning(_)),
            "password mode {password_mode}: {err:?}"
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(())
}

#[tokio::test]
async fn gravatar_picture_is_attached() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}/avatar/", listener.local_addr()?);
    let gravatar = Router::new().route("/avatar/:hash", get(|| async { "png" }));
    tokio::spawn(async move { axum::serve(listener, gravatar).await });

    let config = config()
        .with_gravatar(true)
        .with_gravatar_base_url(base_url.clone());
    let (provider, sender) = provider(config)?;
    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    assert_eq!(
        expect_session(outcome)?.user.picture,
        gravatar_url(&base_url, "ann@example.com")
    );
    Ok(())
}

#[tokio::test]
async fn message_carries_sanitized_values_verbatim() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let request = ConfirmationRequest {
        user: "Tom & Jerry".to_string(),
        ..ann_request()
    };
    provider.request_confirmation(&request).await?;
    let (_, text) = sender.sent().pop().context("nothing was sent")?;
    assert!(
        text.starts_with("Confirmation for Tom & Jerry ann@example.com, site s1"),
        "{text}"
    );
    Ok(())
}

#[tokio::test]
async fn gravatar_failure_is_swallowed() -> Result<()> {
    let config = config()
        .with_gravatar(true)
        .with_gravatar_base_url("http://127.0.0.1:9/avatar/".to_string());
    let (provider, sender) = provider(config)?;
    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    assert!(expect_session(outcome)?.user.picture.is_empty());
    Ok(())
}

#[tokio::test]
async fn redirect_target_must_be_allowed() -> Result<()> {
    let config = config().with_allowed_redirect_hosts(vec!["app.example.com".to_string()]);
    let (provider, sender) = provider(config)?;

    let denied = ConfirmationRequest {
        from: Some("https://evil.example.net/steal".to_string()),
        ..ann_request()
    };
    assert!(matches!(
        provider.request_confirmation(&denied).await,
        Err(VerifyError::Validation(_))
    ));
    let scheme = ConfirmationRequest {
        from: Some("javascript:alert(1)".to_string()),
        ..ann_request()
    };
    assert!(matches!(
        provider.request_confirmation(&scheme).await,
        Err(VerifyError::Validation(_))
    ));
    assert!(sender.sent().is_empty());

    let allowed = ConfirmationRequest {
        from: Some("https://app.example.com/home".to_string()),
        ..ann_request()
    };
    provider.request_confirmation(&allowed).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    assert_eq!(
        expect_session(outcome)?.redirect.as_deref(),
        Some("https://app.example.com/home")
    );
    Ok(())
}

#[tokio::test]
async fn logout_is_idempotent() -> Result<()> {
    let (provider, sender) = provider(config())?;
    provider.request_confirmation(&ann_request()).await?;
    let outcome = provider
        .resolve_login(&sent_token(&sender)?, None, false)
        .await?;
    expect_session(outcome)?;

    let first = provider.logout();
    let second = provider.logout();
    assert_eq!(first, second);
    let cookie = first.get(SET_COOKIE).context("missing cookie")?.to_str()?;
    assert!(cookie.contains("Max-Age=0"));

    assert!(matches!(
        provider.current_user(&cookie_request(&first)?),
        Err(VerifyError::NoSession)
    ));
    Ok(())
}

#[tokio::test]
async fn reject_logs_by_severity() -> Result<()> {
    let logger = Arc::new(RecordingLogger::default());
    let (provider, _) = provider(config())?;
    let provider = provider.with_logger(logger.clone());

    let response = provider.reject(VerifyError::ExpiredToken);
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = provider.reject(VerifyError::UserPersist(anyhow!("disk full")));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let lines = logger.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].0, Level::WARN);
    assert_eq!(lines[1].0, Level::ERROR);
    assert!(lines[1].1.contains("disk full"));
    Ok(())
}

#[test]
fn token_ids_are_random_sha1_hex() -> Result<()> {
    let first = random_token_id()?;
    let second = random_token_id()?;
    assert_eq!(first.len(), 40);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(first, second);
    Ok(())
}

#[test]
fn session_flag_ignores_empty_and_zero() {
    assert!(!session_flag(None));
    assert!(!session_flag(Some("")));
    assert!(!session_flag(Some("0")));
    assert!(session_flag(Some("1")));
    assert!(session_flag(Some("yes")));
}

#[tokio::test]
async fn colon_addresses_reach_the_sender_escaped() -> Result<()> {
    let (provider, sender) = provider(config())?;
    let request = ConfirmationRequest {
        address: "tel:+15550100".to_string(),
        ..ann_request()
    };
    provider.request_confirmation(&request).await?;
    let sent = sender.sent();
    assert_eq!(sent[0].0, "tel&#58;+15550100");
    Ok(())
}
