use axum::{
    body::Body,
    extract::{Extension, Query},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::IntoParams;

use crate::conferma::{
    password::extract_password,
    provider::{session_flag, VerifyProvider},
};

#[derive(IntoParams, Debug, Deserialize, Default)]
#[into_params(parameter_in = Query)]
pub struct CredentialsQuery {
    /// Any non-empty value other than `0` makes the session cookie ephemeral.
    session: Option<String>,
    /// Password, GET only.
    passwd: Option<String>,
}

#[utoipa::path(
    method(get, post),
    path= "/credentials",
    params(CredentialsQuery),
    responses (
        (status = 200, description = "Password accepted, session issued", body = crate::conferma::claims::User),
        (status = 400, description = "Unsupported request or missing password"),
        (status = 403, description = "No pending credentials token, or rejected password"),
        (status = 500, description = "Signing, persistence or password check failure")
    ),
    tag = "conferma",
)]
#[instrument(skip(provider, headers, query, body))]
pub async fn credentials(
    Extension(provider): Extension<Arc<VerifyProvider>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<CredentialsQuery>,
    body: Body,
) -> Response {
    let password = match extract_password(&method, &headers, query.passwd, body).await {
        Ok(password) => password,
        Err(err) => return provider.reject(err),
    };

    match provider
        .finalize_credentials(&headers, session_flag(query.session.as_deref()), Some(password))
        .await
    {
        Ok(session) => session.into_response(),
        Err(err) => provider.reject(err),
    }
}
