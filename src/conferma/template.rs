//! Confirmation message template.
//!
//! Templates use `{{user}}`, `{{address}}`, `{{token}}` and `{{site}}`
//! placeholders. They are validated once at load time. Values are written as
//! given: user, address and site arrive already sanitized and the token is
//! base64url text.

use std::fmt::{self, Write};
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str =
    "Confirmation for {{user}} {{address}}, site {{site}}\n\nToken: {{token}}\n";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown placeholder {{{{{0}}}}}")]
    UnknownPlaceholder(String),
    #[error("unclosed placeholder at byte {0}")]
    Unclosed(usize),
    #[error("failed to write message: {0}")]
    Render(#[from] fmt::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    User,
    Address,
    Token,
    Site,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "user" => Some(Self::User),
            "address" => Some(Self::Address),
            "token" => Some(Self::Token),
            "site" => Some(Self::Site),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
}

/// Values substituted into a confirmation message.
#[derive(Debug, Clone, Copy)]
pub struct MessageData<'a> {
    pub user: &'a str,
    pub address: &'a str,
    pub token: &'a str,
    pub site: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    segments: Vec<Segment>,
}

impl MessageTemplate {
    /// Compile a template source.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] on an unknown or unclosed placeholder.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or(TemplateError::Unclosed(offset + start))?;
            let name = after[..end].trim();
            let field = Field::parse(name)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
            segments.push(Segment::Field(field));

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Render the message for one confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] if the output cannot be written.
    pub fn render(&self, data: &MessageData<'_>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.write_str(text)?,
                Segment::Field(field) => {
                    let value = match field {
                        Field::User => data.user,
                        Field::Address => data.address,
                        Field::Token => data.token,
                        Field::Site => data.site,
                    };
                    out.write_str(value)?;
                }
            }
        }
        Ok(out)
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE).unwrap_or(Self {
            segments: vec![Segment::Field(Field::Token)],
        })
    }
}
