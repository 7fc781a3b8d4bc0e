//! Error types for sppub

use crate::client::RequestError;
use thiserror::Error;

/// Main error type for publishing
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("File '{file_name}' probably is not uploaded: too many errors. Upload process interrupted.")]
    TooManyAttempts { file_name: String },

    #[error("No files matched: nothing to publish")]
    NoFilesMatched,

    /// A server error that no recovery path applies to, passed through unmodified
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Failed to create folder '{folder}': {source}")]
    FolderCreation {
        folder: String,
        #[source]
        source: RequestError,
    },

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("Invalid file descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid site URL '{url}': {reason}")]
    InvalidSiteUrl { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found in {0}")]
    ConfigNotFound(String),

    #[error("File source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PublishError {
    /// The server error carried by this failure, if any
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            PublishError::Request(e) => Some(e),
            PublishError::FolderCreation { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
