//! HTTP transport for sppub

mod auth;
mod client;

pub use auth::SessionAuth;
pub use client::{extract_digest, HttpClient, HttpError};
