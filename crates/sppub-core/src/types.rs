//! Core type definitions for sppub

use crate::error::{PublishError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Comment recorded on checkin when none is configured
pub const DEFAULT_CHECKIN_MESSAGE: &str = "Checked in by sppub";

/// Versioning policy applied at checkin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckinType {
    #[default]
    Minor,
    Major,
    Overwrite,
    /// Skip checkin entirely
    None,
}

impl CheckinType {
    pub fn all() -> &'static [CheckinType] {
        &[
            CheckinType::Minor,
            CheckinType::Major,
            CheckinType::Overwrite,
            CheckinType::None,
        ]
    }

    /// Wire value of the `checkintype` parameter
    pub fn code(&self) -> u8 {
        match self {
            CheckinType::Minor => 0,
            CheckinType::Major => 1,
            CheckinType::Overwrite => 2,
            CheckinType::None => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinType::Minor => "minor",
            CheckinType::Major => "major",
            CheckinType::Overwrite => "overwrite",
            CheckinType::None => "none",
        }
    }
}

impl std::fmt::Display for CheckinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CheckinType {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "minor" | "0" => Ok(CheckinType::Minor),
            "major" | "1" => Ok(CheckinType::Major),
            "overwrite" | "2" => Ok(CheckinType::Overwrite),
            "none" | "3" => Ok(CheckinType::None),
            other => Err(PublishError::Config(format!("Unknown checkin type: {}", other))),
        }
    }
}

/// Normalize a folder path: forward slashes, no leading or trailing slash
pub fn normalize_folder(folder: &str) -> String {
    folder.replace('\\', "/").trim_matches('/').to_string()
}

/// One file to publish
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub name: String,
    pub content: Bytes,
    /// Slash-separated path relative to the site; empty means the site root
    pub folder: String,
}

impl FileDescriptor {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Bytes>,
        folder: impl AsRef<str>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PublishError::InvalidDescriptor(
                "file name must not be empty".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(PublishError::InvalidDescriptor(format!(
                "file name '{}' must not contain path separators",
                name
            )));
        }

        Ok(Self {
            name,
            content: content.into(),
            folder: normalize_folder(folder.as_ref()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Folder and name joined, for log lines
    pub fn display_path(&self) -> String {
        if self.folder.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.folder, self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatchState {
    Pending,
    InFlight,
    Applied,
}

#[derive(Debug, Clone)]
struct PatchEntry {
    metadata: Value,
    state: PatchState,
}

/// Per-run metadata records keyed by file name.
///
/// Each entry is applied at most once per run. A publisher claims the entry
/// before sending the update, so concurrent files sharing a name never both
/// send it; the claim is released if the update fails.
#[derive(Debug, Default)]
pub struct MetadataPatches {
    entries: Mutex<HashMap<String, PatchEntry>>,
}

impl MetadataPatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, file_name: impl Into<String>, metadata: Value) -> Self {
        self.insert(file_name, metadata);
        self
    }

    pub fn insert(&self, file_name: impl Into<String>, metadata: Value) {
        self.lock().insert(
            file_name.into(),
            PatchEntry {
                metadata,
                state: PatchState::Pending,
            },
        );
    }

    /// The record still waiting to be applied for `file_name`
    pub fn pending(&self, file_name: &str) -> Option<Value> {
        self.lock()
            .get(file_name)
            .filter(|entry| entry.state == PatchState::Pending)
            .map(|entry| entry.metadata.clone())
    }

    /// Take the pending record for `file_name`, marking it in flight
    pub fn claim(&self, file_name: &str) -> Option<Value> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(file_name)
            .filter(|entry| entry.state == PatchState::Pending)?;
        entry.state = PatchState::InFlight;
        Some(entry.metadata.clone())
    }

    /// Hand a claimed record back after a failed update
    pub fn release(&self, file_name: &str) {
        if let Some(entry) = self.lock().get_mut(file_name) {
            if entry.state == PatchState::InFlight {
                entry.state = PatchState::Pending;
            }
        }
    }

    pub fn mark_applied(&self, file_name: &str) {
        if let Some(entry) = self.lock().get_mut(file_name) {
            entry.state = PatchState::Applied;
        }
    }

    pub fn is_applied(&self, file_name: &str) -> bool {
        self.lock()
            .get(file_name)
            .map(|entry| entry.state == PatchState::Applied)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PatchEntry>> {
        // Entries hold plain data, a poisoned lock leaves them consistent
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Options shared by every file of one publish run
#[derive(Debug)]
pub struct CoreOptions {
    /// Absolute site URL, without trailing slash
    pub site_url: String,
    pub checkin: bool,
    pub checkin_type: CheckinType,
    pub checkin_message: String,
    pub metadata: MetadataPatches,
}

impl CoreOptions {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into().trim_end_matches('/').to_string(),
            checkin: false,
            checkin_type: CheckinType::default(),
            checkin_message: DEFAULT_CHECKIN_MESSAGE.to_string(),
            metadata: MetadataPatches::new(),
        }
    }

    pub fn with_checkin(mut self, checkin_type: CheckinType) -> Self {
        self.checkin = true;
        self.checkin_type = checkin_type;
        self
    }

    pub fn with_checkin_message(mut self, message: impl Into<String>) -> Self {
        self.checkin_message = message.into();
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataPatches) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether the checkout/checkin steps run at all
    pub fn checkin_enabled(&self) -> bool {
        self.checkin && self.checkin_type != CheckinType::None
    }
}

/// Result of one successful publish
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Uploaded without checkin; carries the server's file record
    Uploaded(Value),
    /// Uploaded and checked in; carries the checkin response
    CheckedIn(Value),
    /// Zero-length content, nothing was sent
    SkippedEmpty,
}

impl PublishOutcome {
    pub fn payload(&self) -> Option<&Value> {
        match self {
            PublishOutcome::Uploaded(v) | PublishOutcome::CheckedIn(v) => Some(v),
            PublishOutcome::SkippedEmpty => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PublishOutcome::SkippedEmpty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishOutcome::Uploaded(_) => "uploaded",
            PublishOutcome::CheckedIn(_) => "checked in",
            PublishOutcome::SkippedEmpty => "skipped (empty)",
        }
    }
}

/// How a batch dispatches its files
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Sequential,
    Parallel,
}

/// Outcome of one file within a batch
#[derive(Debug, Clone)]
pub struct FileResult {
    pub name: String,
    pub folder: String,
    pub outcome: PublishOutcome,
}

/// Summary of a fully successful batch
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub results: Vec<FileResult>,
    pub duration_ms: u64,
    pub mode: DispatchMode,
}

impl BatchSummary {
    pub fn published(&self) -> usize {
        self.results.iter().filter(|r| !r.outcome.is_skipped()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_skipped()).count()
    }
}

/// Result of validating a configuration
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: ValidationError) -> Self {
        self.valid = false;
        self.errors.push(error);
        self
    }

    pub fn with_warning(mut self, warning: ValidationWarning) -> Self {
        self.warnings.push(warning);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}
