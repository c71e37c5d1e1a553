//! Inbound webhook requests as the normalizer sees them.
//!
//! The routing layer copies headers and the raw body into an
//! [`InboundWebhook`]; the body is only decoded after its signature has been
//! checked against the exact bytes that arrived.

use bytes::Bytes;
use hookrelay_sdk::objects::SourcePlatform;
use serde_json::Value;
use thiserror::Error;

/// Which adapter should handle a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformHint {
    /// Detect the Git host from its event header.
    DetectGitHost,
    /// The route already determines the platform.
    Fixed(SourcePlatform),
}

/// Request headers with case-insensitive lookup.
///
/// Names are lowercased on insert. Repeated headers keep the first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    entries: Vec<(String, String)>,
}

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        if !self.entries.iter().any(|(k, _)| *k == name) {
            self.entries.push((name, value.into()));
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for WebhookHeaders {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = WebhookHeaders::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// A webhook request waiting to be normalized.
#[derive(Debug, Clone)]
pub struct InboundWebhook {
    pub hint: PlatformHint,
    pub headers: WebhookHeaders,
    pub raw_body: Bytes,
}

impl InboundWebhook {
    pub fn new(hint: PlatformHint, headers: WebhookHeaders, raw_body: impl Into<Bytes>) -> Self {
        Self {
            hint,
            headers,
            raw_body: raw_body.into(),
        }
    }
}

/// Why a payload could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("request body is empty")]
    EmptyBody,
    #[error("request body is not valid UTF-8")]
    InvalidEncoding,
    #[error("form body has no `payload` field")]
    MissingFormPayload,
    #[error("malformed JSON: {0}")]
    InvalidJson(String),
    #[error("payload root must be a JSON object")]
    NotAnObject,
    #[error("payload is missing `{0}`")]
    MissingField(&'static str),
}

/// Decode a webhook body into JSON according to its content type.
///
/// Form bodies carry the JSON document in their `payload` field, the way
/// GitHub and Gogs send it when configured for `x-www-form-urlencoded`.
/// Any other content type is parsed as JSON.
pub fn decode_payload(content_type: Option<&str>, body: &[u8]) -> Result<Value, ParseError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::EmptyBody);
    }
    let text = std::str::from_utf8(body).map_err(|_| ParseError::InvalidEncoding)?;

    let is_form = content_type
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
        .unwrap_or(false);

    let value: Value = if is_form {
        let json = form_field(text, "payload")?.ok_or(ParseError::MissingFormPayload)?;
        serde_json::from_str(&json).map_err(|e| ParseError::InvalidJson(e.to_string()))?
    } else {
        serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?
    };

    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    Ok(value)
}

/// Look up and URL-decode one field of a form body.
fn form_field(body: &str, name: &str) -> Result<Option<String>, ParseError> {
    for pair in body.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == name {
            let value = value.replace('+', " ");
            let decoded =
                urlencoding::decode(&value).map_err(|_| ParseError::InvalidEncoding)?;
            return Ok(Some(decoded.into_owned()));
        }
    }
    Ok(None)
}
