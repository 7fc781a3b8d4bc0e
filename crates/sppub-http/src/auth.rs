//! Session material attached to every request

use reqwest::RequestBuilder;
use std::fmt;

/// Credentials negotiated outside sppub, passed through as-is
#[derive(Clone, Default, PartialEq, Eq)]
pub enum SessionAuth {
    #[default]
    None,
    /// OAuth access token, sent as `Authorization: Bearer ...`
    Bearer(String),
    /// Raw `Cookie` header value, e.g. `FedAuth=...; rtFa=...`
    Cookie(String),
}

impl SessionAuth {
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            SessionAuth::None => builder,
            SessionAuth::Bearer(token) => builder.bearer_auth(token),
            SessionAuth::Cookie(cookie) => builder.header(reqwest::header::COOKIE, cookie),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SessionAuth::None => "none",
            SessionAuth::Bearer(_) => "bearer",
            SessionAuth::Cookie(_) => "cookie",
        }
    }
}

// Keeps secrets out of logs
impl fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionAuth::None => write!(f, "SessionAuth::None"),
            other => write!(f, "SessionAuth::{}(***)", other.kind()),
        }
    }
}
