use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

use crate::conferma::{
    error::VerifyError,
    provider::{LoginQuery, VerifyProvider},
};

#[utoipa::path(
    get,
    path= "/login",
    params(LoginQuery),
    responses (
        (status = 200, description = "Confirmation sent, or the user of the new session", body = crate::conferma::provider::Acknowledgment),
        (status = 307, description = "Logged in, redirecting to the origin"),
        (status = 400, description = "Missing user or address, or a malformed handshake"),
        (status = 403, description = "Invalid, expired or wrong-state token"),
        (status = 500, description = "Signing, delivery or persistence failure")
    ),
    tag = "conferma",
)]
#[instrument(skip(provider, query))]
pub async fn login(
    Extension(provider): Extension<Arc<VerifyProvider>>,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(err) => {
            return provider.reject(VerifyError::UnsupportedRequest(err.body_text()));
        }
    };

    match provider.login(&query).await {
        Ok(outcome) => outcome.into_response(),
        Err(err) => provider.reject(err),
    }
}
