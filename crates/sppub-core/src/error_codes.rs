//! Server error-code classification
//!
//! The server reports failures with a numeric identifier at the start of
//! `error.code`. Matching is by prefix, the way the server formats the
//! field (`"<code>, <exception type>"`).

use crate::client::RequestError;

pub const SAVE_CONFLICT: &str = "-2130246326";
pub const CONTENT_ENGINE_CONFLICT: &str = "-1597308888";
pub const DIRECTORY_NOT_FOUND: &str = "-2147024893";
pub const FILE_NOT_FOUND_ON_PREMISES: &str = "-2146232832";
pub const FILE_NOT_FOUND_ONLINE: &str = "-2130575338";

/// Server error codes the publishing protocol reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorCode {
    SaveConflict,
    ContentEngineConflict,
    DirectoryNotFound,
    FileNotFound,
}

impl ServerErrorCode {
    /// Transient write contention that clears up on re-upload
    pub fn is_conflict(self) -> bool {
        matches!(
            self,
            ServerErrorCode::SaveConflict | ServerErrorCode::ContentEngineConflict
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerErrorCode::SaveConflict => "save conflict",
            ServerErrorCode::ContentEngineConflict => "content engine conflict",
            ServerErrorCode::DirectoryNotFound => "directory not found",
            ServerErrorCode::FileNotFound => "file not found",
        }
    }
}

impl std::fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a raw `error.code` string to a known code
pub fn classify_code(code: &str) -> Option<ServerErrorCode> {
    let code = code.trim_start();
    if code.starts_with(SAVE_CONFLICT) {
        Some(ServerErrorCode::SaveConflict)
    } else if code.starts_with(CONTENT_ENGINE_CONFLICT) {
        Some(ServerErrorCode::ContentEngineConflict)
    } else if code.starts_with(DIRECTORY_NOT_FOUND) {
        Some(ServerErrorCode::DirectoryNotFound)
    } else if code.starts_with(FILE_NOT_FOUND_ON_PREMISES) || code.starts_with(FILE_NOT_FOUND_ONLINE)
    {
        Some(ServerErrorCode::FileNotFound)
    } else {
        None
    }
}

/// Classify a failed request by the code embedded in its error body.
///
/// Returns `None` when the body is not the expected error shape or the
/// code is not one the protocol knows.
pub fn classify(error: &RequestError) -> Option<ServerErrorCode> {
    error.body.error_code().as_deref().and_then(classify_code)
}
