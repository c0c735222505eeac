//! Cleanup for untrusted query values before they enter a token or a message.
//!
//! Sanitized values end up unescaped inside confirmation messages and inside
//! the `user::address` handshake ID, so the separator character never
//! survives here: `:` stays escaped as `&#58;`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on any sanitized field.
pub const MAX_FIELD_LEN: usize = 128;

const ACTIVE_ELEMENTS: [&str; 12] = [
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea", "select",
    "svg", "math", "frameset",
];

// Active elements are dropped together with their content.
static ACTIVE_MARKUP: Lazy<Option<Regex>> = Lazy::new(|| {
    let pattern = ACTIVE_ELEMENTS
        .iter()
        .map(|tag| format!(r"<{tag}\b[^>]*>.*?</\s*{tag}\s*>|<{tag}\b[^>]*/?>"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?is){pattern}")).ok()
});

static COMMENTS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").ok());

static TAGS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"</?[a-zA-Z!/][^<>]*>").ok());

#[must_use]
pub fn sanitize(input: &str) -> String {
    let stripped = strip_markup(input);
    let escaped = escape_html(&stripped)
        .replace("&amp;", "&")
        .replace("&#34;", "\"")
        .replace("&#39;", "'");
    let flattened: String = escaped.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    flattened.trim().chars().take(MAX_FIELD_LEN).collect()
}

fn strip_markup(input: &str) -> String {
    let mut result = input.to_string();
    for regex in [&*ACTIVE_MARKUP, &*COMMENTS, &*TAGS].into_iter().flatten() {
        result = regex.replace_all(&result, "").into_owned();
    }
    result
}

/// HTML-escape the characters that matter in element content and attributes,
/// plus `:` so the handshake separator cannot be forged.
fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            ':' => escaped.push_str("&#58;"),
            '\0' => escaped.push('\u{FFFD}'),
            _ => escaped.push(c),
        }
    }
    escaped
}
