//! Scripted in-memory request client for tests

use crate::client::{ErrorBody, PostRequest, RequestClient, RequestError, Response};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub type Reply = Result<Response, RequestError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub request: Option<PostRequest>,
}

/// Replies are queued per (method, url); a sticky reply answers once the
/// queue is drained. Anything unscripted fails with status 599.
#[derive(Default)]
pub struct MockClient {
    queued: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    sticky: Mutex<HashMap<(Method, String), Reply>>,
    calls: Mutex<Vec<Call>>,
    digests: AtomicUsize,
    failing_digest: Mutex<Option<RequestError>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(&self, url: impl Into<String>, reply: Reply) -> &Self {
        self.queue(Method::Get, url.into(), reply)
    }

    pub fn on_post(&self, url: impl Into<String>, reply: Reply) -> &Self {
        self.queue(Method::Post, url.into(), reply)
    }

    pub fn always_get(&self, url: impl Into<String>, reply: Reply) -> &Self {
        self.sticky.lock().unwrap().insert((Method::Get, url.into()), reply);
        self
    }

    pub fn always_post(&self, url: impl Into<String>, reply: Reply) -> &Self {
        self.sticky.lock().unwrap().insert((Method::Post, url.into()), reply);
        self
    }

    pub fn fail_digest(&self, error: RequestError) {
        *self.failing_digest.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.url == url)
            .count()
    }

    pub fn posts_to(&self, url: &str) -> Vec<PostRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == Method::Post && c.url == url)
            .filter_map(|c| c.request.clone())
            .collect()
    }

    /// URLs in call order, prefixed with the method
    pub fn trace(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| match c.method {
                Method::Get => format!("GET {}", c.url),
                Method::Post => format!("POST {}", c.url),
            })
            .collect()
    }

    pub fn digest_count(&self) -> usize {
        self.digests.load(Ordering::SeqCst)
    }

    fn queue(&self, method: Method, url: String, reply: Reply) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .entry((method, url))
            .or_default()
            .push_back(reply);
        self
    }

    fn reply(&self, method: Method, url: &str) -> Reply {
        let key = (method, url.to_string());
        if let Some(reply) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        if let Some(reply) = self.sticky.lock().unwrap().get(&key) {
            return reply.clone();
        }
        Err(RequestError::new(
            url,
            599,
            ErrorBody::Raw(format!("unscripted {:?} request", method)),
        ))
    }
}

#[async_trait]
impl RequestClient for MockClient {
    async fn get(&self, url: &str) -> Result<Response, RequestError> {
        self.calls.lock().unwrap().push(Call {
            method: Method::Get,
            url: url.to_string(),
            request: None,
        });
        tokio::task::yield_now().await;
        self.reply(Method::Get, url)
    }

    async fn post(&self, url: &str, request: PostRequest) -> Result<Response, RequestError> {
        self.calls.lock().unwrap().push(Call {
            method: Method::Post,
            url: url.to_string(),
            request: Some(request),
        });
        tokio::task::yield_now().await;
        self.reply(Method::Post, url)
    }

    async fn request_digest(&self, _site_url: &str) -> Result<String, RequestError> {
        if let Some(error) = self.failing_digest.lock().unwrap().clone() {
            return Err(error);
        }
        let n = self.digests.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("digest-{}", n))
    }
}

pub fn ok(body: Value) -> Reply {
    Ok(Response::new(200, body.to_string()))
}

pub fn ok_empty() -> Reply {
    Ok(Response::new(200, ""))
}

/// Error reply with a server error code in the verbose OData shape
pub fn fail_with_code(url: &str, status: u16, code: &str) -> Reply {
    Err(RequestError::new(
        url,
        status,
        ErrorBody::Structured(json!({
            "error": {
                "code": format!("{}, Microsoft.SharePoint.SPException", code),
                "message": { "lang": "en-US", "value": "scripted failure" }
            }
        })),
    ))
}

pub fn fail_raw(url: &str, status: u16, body: &str) -> Reply {
    Err(RequestError::new(url, status, ErrorBody::Raw(body.to_string())))
}
