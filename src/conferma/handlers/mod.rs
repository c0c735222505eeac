use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::provider::{LoginOutcome, Session};

pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod credentials;
pub use self::credentials::credentials;

pub mod logout;
pub use self::logout::logout;

pub mod user;
pub use self::user::user;

pub mod openapi;
pub use self::openapi::openapi_json;

/// Body returned while the password step is pending.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Status {
    pub status: String,
}

impl IntoResponse for Session {
    fn into_response(self) -> Response {
        match self.redirect {
            Some(target) => (self.cookies, Redirect::temporary(&target)).into_response(),
            None => (StatusCode::OK, self.cookies, Json(self.user)).into_response(),
        }
    }
}

impl IntoResponse for LoginOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::ConfirmationSent(ack) => (StatusCode::OK, Json(ack)).into_response(),
            Self::Confirmed { cookies } => (
                StatusCode::OK,
                cookies,
                Json(Status {
                    status: "confirmed".to_string(),
                }),
            )
                .into_response(),
            Self::Authenticated(session) => session.into_response(),
        }
    }
}
