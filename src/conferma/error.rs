//! Failure taxonomy for the confirmation flow and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use super::template::TemplateError;
use super::token::TokenError;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid token: {0}")]
    InvalidToken(#[source] TokenError),
    #[error("token expired")]
    ExpiredToken,
    #[error("invalid token state: {0}")]
    InvalidState(String),
    #[error("malformed handshake id")]
    MalformedHandshake,
    #[error("failed to sign token: {0}")]
    TokenSigning(#[source] TokenError),
    #[error("failed to render confirmation: {0}")]
    Template(#[from] TemplateError),
    #[error("failed to deliver confirmation: {0:#}")]
    Delivery(anyhow::Error),
    #[error("failed to save user: {0:#}")]
    UserPersist(anyhow::Error),
    #[error("failed to save avatar: {0:#}")]
    AvatarPersist(anyhow::Error),
    #[error("failed to generate token id: {0}")]
    IdGeneration(#[source] rand::Error),
    #[error("unsupported request: {0}")]
    UnsupportedRequest(String),
    #[error("no active session")]
    NoSession,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("failed to check credentials: {0:#}")]
    CredentialCheck(anyhow::Error),
}

impl VerifyError {
    /// Token-protocol violations all map to 403 so callers cannot tell a
    /// forged token from one in the wrong state.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidToken(_)
            | Self::ExpiredToken
            | Self::InvalidState(_)
            | Self::InvalidCredentials => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::MalformedHandshake | Self::UnsupportedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NoSession => StatusCode::UNAUTHORIZED,
            Self::TokenSigning(_)
            | Self::Template(_)
            | Self::Delivery(_)
            | Self::UserPersist(_)
            | Self::AvatarPersist(_)
            | Self::IdGeneration(_)
            | Self::CredentialCheck(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client. Validation detail describes the
    /// client's own input; everything else stays in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        let message = match self {
            Self::Validation(detail) => return detail.clone(),
            Self::InvalidToken(_) | Self::ExpiredToken | Self::InvalidState(_) => {
                "failed to verify confirmation token"
            }
            Self::MalformedHandshake => "invalid handshake token",
            Self::TokenSigning(_) => "failed to set token",
            Self::Template(_) => "can't execute confirmation template",
            Self::Delivery(_) => "failed to send confirmation",
            Self::UserPersist(_) => "failed to save user",
            Self::AvatarPersist(_) => "failed to save avatar to proxy",
            Self::IdGeneration(_) => "can't make token id",
            Self::UnsupportedRequest(_) => "unsupported request",
            Self::NoSession => "no active session",
            Self::InvalidCredentials => "incorrect user or password",
            Self::CredentialCheck(_) => "failed to check user credentials",
        };
        message.to_string()
    }

    /// Downstream collaborator failures, as opposed to client mistakes.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}
