//! Stateless extraction of the `passwd` value submitted in the password step.

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, HeaderMap, Method},
};
use secrecy::SecretString;
use serde::Deserialize;
use url::form_urlencoded;

use super::error::VerifyError;

/// Request bodies larger than this are refused.
pub const MAX_HTTP_BODY_SIZE: usize = 1024 * 1024;

#[derive(Deserialize)]
struct PasswordBody {
    #[serde(default)]
    passwd: String,
}

/// Read the password from the query (GET), a JSON body or a form body (POST).
///
/// # Errors
///
/// Returns [`VerifyError::UnsupportedRequest`] for other methods, unsupported
/// content types, oversized bodies and bodies that cannot be parsed.
pub async fn extract_password(
    method: &Method,
    headers: &HeaderMap,
    query_passwd: Option<String>,
    body: Body,
) -> Result<SecretString, VerifyError> {
    if method == Method::GET {
        return Ok(SecretString::from(query_passwd.unwrap_or_default()));
    }
    if method != Method::POST {
        return Err(VerifyError::UnsupportedRequest(format!(
            "method {method} not supported"
        )));
    }

    let content_type = media_type(headers)?;
    let bytes = to_bytes(body, MAX_HTTP_BODY_SIZE).await.map_err(|err| {
        VerifyError::UnsupportedRequest(format!("failed to read request body: {err}"))
    })?;

    match content_type.as_deref() {
        Some("application/json") => {
            let creds: PasswordBody = serde_json::from_slice(&bytes).map_err(|err| {
                VerifyError::UnsupportedRequest(format!("failed to parse request body: {err}"))
            })?;
            Ok(SecretString::from(creds.passwd))
        }
        None | Some("application/x-www-form-urlencoded") => {
            // Form values win over the query string, like a merged form.
            let passwd = form_urlencoded::parse(&bytes)
                .find(|(key, _)| key == "passwd")
                .map(|(_, value)| value.into_owned())
                .or(query_passwd)
                .unwrap_or_default();
            Ok(SecretString::from(passwd))
        }
        Some(other) => Err(VerifyError::UnsupportedRequest(format!(
            "content type {other} not supported"
        ))),
    }
}

fn media_type(headers: &HeaderMap) -> Result<Option<String>, VerifyError> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| VerifyError::UnsupportedRequest("invalid content type".to_string()))?;
    let media = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if media.is_empty() {
        Ok(None)
    } else if media.contains('/') {
        Ok(Some(media))
    } else {
        Err(VerifyError::UnsupportedRequest(format!(
            "malformed content type {media}"
        )))
    }
}
