use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::conferma::provider::VerifyProvider;

#[utoipa::path(
    get,
    path= "/logout",
    responses (
        (status = 200, description = "Session cookie cleared")
    ),
    tag = "conferma",
)]
pub async fn logout(Extension(provider): Extension<Arc<VerifyProvider>>) -> impl IntoResponse {
    (StatusCode::OK, provider.logout())
}
