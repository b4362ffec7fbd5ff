//! Redaction helpers for diagnostic logging.
//!
//! Every header map or response body that reaches a `tracing` call goes
//! through this module first. Use `RedactedHeaders(&headers)` instead of
//! `?headers` and [`redact_body`] instead of the raw body text.
//!
//! # Security Invariants
//!
//! - Bearer tokens are shown as a short prefix and suffix plus their length.
//! - A body that decodes as a single JSON string is treated as a secret (the
//!   checkout response shape) and replaced by its length.
//! - Responses from a `CheckOutPassword` path are never logged, whatever
//!   their shape.
//! - JSON objects, arrays and unquoted text are passed through unchanged.

use std::borrow::Cow;
use std::fmt;

use reqwest::header::{AUTHORIZATION, HeaderMap};

/// Characters kept at each end of a redacted token.
const TOKEN_EDGE: usize = 4;

/// Tokens at or below this length are hidden entirely.
const MIN_PARTIAL_TOKEN_LEN: usize = 16;

/// Redact a token for logging, keeping only a short prefix and suffix.
pub fn redact_token(token: &str) -> String {
    let len = token.chars().count();
    if len <= MIN_PARTIAL_TOKEN_LEN {
        return format!("<{len} chars>");
    }
    let prefix: String = token.chars().take(TOKEN_EDGE).collect();
    let suffix: String = token.chars().skip(len - TOKEN_EDGE).collect();
    format!("{prefix}...{suffix} <{len} chars>")
}

/// Redact an `Authorization` header value, preserving the scheme.
pub fn redact_authorization(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, token)) => format!("{scheme} {}", redact_token(token.trim())),
        None => redact_token(value),
    }
}

/// Path segment of the secret checkout endpoint.
const CHECKOUT_SEGMENT: &str = "CheckOutPassword";

/// True for a body that is a single JSON string.
pub fn is_secret_shaped(body: &str) -> bool {
    serde_json::from_str::<String>(body.trim()).is_ok()
}

/// Body text safe to log.
pub fn redact_body(body: &str) -> Cow<'_, str> {
    match serde_json::from_str::<String>(body.trim()) {
        Ok(secret) => Cow::Owned(format!("<redacted {} chars>", secret.chars().count())),
        Err(_) => Cow::Borrowed(body),
    }
}

/// True when `path` addresses the secret checkout endpoint.
pub fn is_checkout_path(path: &str) -> bool {
    path.split('?')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .is_some_and(|segment| segment.eq_ignore_ascii_case(CHECKOUT_SEGMENT))
}

/// Response body text safe to log for a request to `path`.
pub fn redact_response_body<'a>(path: &str, body: &'a str) -> Cow<'a, str> {
    if is_checkout_path(path) {
        Cow::Owned(format!("<redacted {} bytes>", body.len()))
    } else {
        redact_body(body)
    }
}

/// Debug wrapper for a header map that hides credentials.
pub struct RedactedHeaders<'a>(pub &'a HeaderMap);

impl fmt::Debug for RedactedHeaders<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.0 {
            let shown = match value.to_str() {
                Ok(text) if name == AUTHORIZATION => redact_authorization(text),
                Ok(text) => text.to_string(),
                Err(_) => format!("<{} bytes>", value.len()),
            };
            map.entry(&name.as_str(), &shown);
        }
        map.finish()
    }
}
