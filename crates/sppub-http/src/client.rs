//! reqwest implementation of [`RequestClient`]

use crate::auth::SessionAuth;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use sppub_core::{
    ErrorBody, PostRequest, RequestBody, RequestClient, RequestError, Response, ODATA_VERBOSE,
};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Pull the form digest out of a `contextinfo` response.
///
/// Accepts both the verbose (`d.GetContextWebInformation`) and the
/// `nometadata` shapes.
pub fn extract_digest(body: &Value) -> Option<String> {
    body.pointer("/d/GetContextWebInformation/FormDigestValue")
        .or_else(|| body.get("FormDigestValue"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub struct HttpClient {
    http: reqwest::Client,
    auth: SessionAuth,
}

impl HttpClient {
    pub fn new(auth: SessionAuth) -> Result<Self, HttpError> {
        Self::with_timeout(auth, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(auth: SessionAuth, timeout: Duration) -> Result<Self, HttpError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sppub/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, auth })
    }

    pub fn auth(&self) -> &SessionAuth {
        &self.auth
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<Response, RequestError> {
        let builder = self.auth.apply(builder.header(ACCEPT, ODATA_VERBOSE));

        let response = builder
            .send()
            .await
            .map_err(|e| RequestError::transport(url, e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::transport(url, e.to_string()))?;

        debug!("{} -> {}", url, status);

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(RequestError::new(url, status.as_u16(), ErrorBody::parse(&text)));
        }

        Ok(Response::new(status.as_u16(), body))
    }
}

#[async_trait]
impl RequestClient for HttpClient {
    async fn get(&self, url: &str) -> Result<Response, RequestError> {
        debug!("GET {}", url);
        self.send(self.http.get(url), url).await
    }

    async fn post(&self, url: &str, request: PostRequest) -> Result<Response, RequestError> {
        debug!("POST {}", url);
        let has_content_type = request.header_value(CONTENT_TYPE.as_str()).is_some();
        let mut builder = self.http.post(url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder.body(Bytes::new()),
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Json(value) => {
                let body = serde_json::to_vec(&value)
                    .map_err(|e| RequestError::transport(url, e.to_string()))?;
                if !has_content_type {
                    builder = builder.header(CONTENT_TYPE, ODATA_VERBOSE);
                }
                builder.body(body)
            }
        };

        self.send(builder, url).await
    }

    async fn request_digest(&self, site_url: &str) -> Result<String, RequestError> {
        let url = format!("{}/_api/contextinfo", site_url.trim_end_matches('/'));
        let response = self.post(&url, PostRequest::new()).await?;

        let body = response
            .json()
            .map_err(|e| RequestError::transport(&url, format!("invalid contextinfo body: {}", e)))?;

        extract_digest(&body)
            .ok_or_else(|| RequestError::transport(&url, "FormDigestValue missing from contextinfo"))
    }
}
