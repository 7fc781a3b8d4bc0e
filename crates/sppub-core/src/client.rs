//! Authenticated request capability
//!
//! The publisher never talks to the network directly. Everything goes
//! through a [`RequestClient`], which is expected to attach whatever
//! session material the caller negotiated with the server.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;

/// Header carrying the anti-forgery token on mutating calls
pub const DIGEST_HEADER: &str = "X-RequestDigest";

/// Content type used for JSON payloads
pub const ODATA_VERBOSE: &str = "application/json;odata=verbose";

/// A successful (2xx) server response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }

    /// Parse the body as JSON, mapping an empty body to `null`
    pub fn json_or_null(&self) -> serde_json::Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        self.json()
    }
}

/// Body of a POST request
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Bytes),
    Json(Value),
}

/// A POST request: extra headers plus a body
#[derive(Debug, Clone, Default)]
pub struct PostRequest {
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl PostRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn digest(self, token: &str) -> Self {
        self.header(DIGEST_HEADER, token)
    }

    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Look up a header, ignoring case
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Error payload returned by the server
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Structured(Value),
    Raw(String),
}

impl ErrorBody {
    /// Keep JSON bodies structured, everything else as raw text
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) if value.is_object() => ErrorBody::Structured(value),
            _ => ErrorBody::Raw(text.to_string()),
        }
    }

    /// The error object, whether it arrived structured or as a JSON string
    pub fn structured(&self) -> Option<Value> {
        match self {
            ErrorBody::Structured(value) => Some(value.clone()),
            ErrorBody::Raw(text) => serde_json::from_str::<Value>(text)
                .ok()
                .filter(Value::is_object),
        }
    }

    /// The server's `error.code` string, e.g. `"-2130246326, Microsoft.SharePoint.SPException"`
    pub fn error_code(&self) -> Option<String> {
        let value = self.structured()?;
        let error = value.get("error").or_else(|| value.get("odata.error"))?;
        error.get("code")?.as_str().map(str::to_string)
    }

    fn message(&self) -> String {
        match self {
            ErrorBody::Raw(text) => text.clone(),
            ErrorBody::Structured(value) => {
                let error = value.get("error").or_else(|| value.get("odata.error"));
                let message = error.and_then(|e| e.get("message")).and_then(|m| {
                    m.get("value")
                        .and_then(Value::as_str)
                        .or_else(|| m.as_str())
                });
                match message {
                    Some(m) => m.to_string(),
                    None => value.to_string(),
                }
            }
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// A failed request: non-2xx response or transport failure
#[derive(Debug, Clone, PartialEq)]
pub struct RequestError {
    pub url: String,
    /// HTTP status, absent when the request never got a response
    pub status: Option<u16>,
    pub body: ErrorBody,
}

impl RequestError {
    pub fn new(url: impl Into<String>, status: u16, body: ErrorBody) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            body,
        }
    }

    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            body: ErrorBody::Raw(message.into()),
        }
    }

    pub fn has_status(&self, status: u16) -> bool {
        self.status == Some(status)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "Request to {} failed ({}): {}", self.url, status, self.body),
            None => write!(f, "Request to {} failed (no response): {}", self.url, self.body),
        }
    }
}

impl std::error::Error for RequestError {}

/// Authenticated HTTP capability used for every network call
#[async_trait]
pub trait RequestClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<Response, RequestError>;

    async fn post(&self, url: &str, request: PostRequest) -> Result<Response, RequestError>;

    /// Fetch a fresh anti-forgery token for the given site
    async fn request_digest(&self, site_url: &str) -> Result<String, RequestError>;
}
