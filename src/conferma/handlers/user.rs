use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::conferma::provider::VerifyProvider;

#[utoipa::path(
    get,
    path= "/user",
    responses (
        (status = 200, description = "User of the current session", body = crate::conferma::claims::User),
        (status = 401, description = "No session presented"),
        (status = 403, description = "Invalid or expired session, or a handshake token")
    ),
    tag = "conferma",
)]
/// Return the user behind the session cookie or bearer token.
pub async fn user(
    Extension(provider): Extension<Arc<VerifyProvider>>,
    headers: HeaderMap,
) -> Response {
    match provider.current_user(&headers) {
        Ok(user) => Json(user).into_response(),
        Err(err) => provider.reject(err),
    }
}
