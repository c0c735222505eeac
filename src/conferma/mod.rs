#![allow(clippy::needless_for_each)]

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod avatar;
pub mod claims;
pub mod error;
pub mod handlers;
pub mod logger;
pub mod password;
pub mod provider;
pub mod sanitize;
pub mod sender;
pub mod template;
pub mod token;
pub mod users;

#[cfg(test)]
mod tests;

pub use self::provider::{VerifyConfig, VerifyProvider};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::login::login,
        handlers::credentials::credentials,
        handlers::logout::logout,
        handlers::user::user,
        handlers::openapi::openapi_json,
    ),
    components(
        schemas(
            handlers::health::Health,
            handlers::Status,
            provider::Acknowledgment,
            claims::User,
        )
    ),
    tags(
        (name = "conferma", description = "Passwordless confirmation login API"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Routes of the service. `/credentials` only exists in password mode.
#[must_use]
pub fn router(provider: Arc<VerifyProvider>) -> Router {
    let mut app = Router::new()
        .route("/login", get(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/user", get(handlers::user))
        .route("/openapi.json", get(handlers::openapi_json));

    if provider.config().password_mode() {
        app = app.route(
            "/credentials",
            get(handlers::credentials).post(handlers::credentials),
        );
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(provider)),
    )
    .route("/health", get(handlers::health).options(handlers::health))
}

/// Serve the router until Ctrl-C.
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(port: u16, provider: Arc<VerifyProvider>) -> Result<()> {
    let app = router(provider);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Gracefully shutdown"),
        Err(err) => {
            error!("Failed to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
