//! File sources: turn declarative entries into [`FileDescriptor`]s

use crate::error::{PublishError, Result};
use crate::types::{normalize_folder, FileDescriptor};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Where the files of a publish run come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSource {
    /// Inline content for a single file
    Content {
        file_name: String,
        content: String,
        #[serde(default)]
        folder: String,
    },
    /// Files on disk matched by glob patterns.
    ///
    /// Each file lands in `folder` plus its directory relative to `base`.
    /// Without `base`, every file goes straight into `folder`.
    Glob {
        #[serde(rename = "glob")]
        patterns: Vec<String>,
        #[serde(default)]
        folder: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base: Option<PathBuf>,
    },
}

impl FileSource {
    pub fn content(
        file_name: impl Into<String>,
        content: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        FileSource::Content {
            file_name: file_name.into(),
            content: content.into(),
            folder: folder.into(),
        }
    }

    pub fn glob(patterns: Vec<String>, folder: impl Into<String>, base: Option<PathBuf>) -> Self {
        FileSource::Glob {
            patterns,
            folder: folder.into(),
            base,
        }
    }

    /// File name this source produces, when known without touching the disk
    pub fn static_file_name(&self) -> Option<&str> {
        match self {
            FileSource::Content { file_name, .. } => Some(file_name.as_str()),
            FileSource::Glob { .. } => None,
        }
    }
}

/// Resolve every source against `cwd`, keeping discovery order
pub fn resolve(sources: &[FileSource], cwd: &Path) -> Result<Vec<FileDescriptor>> {
    let mut files = Vec::new();
    for source in sources {
        match source {
            FileSource::Content {
                file_name,
                content,
                folder,
            } => {
                files.push(FileDescriptor::new(
                    file_name.clone(),
                    content.clone().into_bytes(),
                    folder,
                )?);
            }
            FileSource::Glob {
                patterns,
                folder,
                base,
            } => {
                let base = base.as_ref().map(|b| absolute(cwd, b));
                for path in expand(patterns, cwd)? {
                    files.push(read_file(&path, folder, base.as_deref())?);
                }
            }
        }
    }
    debug!("Resolved {} file(s) from {} source(s)", files.len(), sources.len());
    Ok(files)
}

/// Matched regular files, pattern by pattern
fn expand(patterns: &[String], cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut matched = Vec::new();
    for pattern in patterns {
        let full = absolute(cwd, Path::new(pattern));
        let entries = glob::glob(&full.to_string_lossy())
            .map_err(|e| PublishError::Source(format!("Invalid glob pattern '{}': {}", pattern, e)))?;

        for entry in entries {
            let path = entry.map_err(|e| PublishError::Source(e.to_string()))?;
            if path.is_file() {
                matched.push(path);
            }
        }
    }
    Ok(matched)
}

fn read_file(path: &Path, folder: &str, base: Option<&Path>) -> Result<FileDescriptor> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PublishError::Source(format!("No file name in '{}'", path.display())))?;

    let folder = destination_folder(path, folder, base)?;
    let content = std::fs::read(path)?;
    FileDescriptor::new(name, content, folder)
}

/// `folder` joined with the file's directory relative to `base`
pub fn destination_folder(path: &Path, folder: &str, base: Option<&Path>) -> Result<String> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let relative = match base {
        None => PathBuf::new(),
        Some(base) => parent
            .strip_prefix(base)
            .map(Path::to_path_buf)
            .map_err(|_| {
                PublishError::Source(format!(
                    "'base' should be a prefix of the file path. base: {}, file path: {}",
                    base.display(),
                    path.display()
                ))
            })?,
    };

    let mut segments: Vec<String> = Vec::new();
    let folder = normalize_folder(folder);
    if !folder.is_empty() {
        segments.push(folder);
    }
    for component in relative.components() {
        if let Component::Normal(part) = component {
            segments.push(part.to_string_lossy().into_owned());
        }
    }
    Ok(normalize_folder(&segments.join("/")))
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
