//! CLI commands

pub mod auth;
pub mod init;
pub mod publish;
pub mod urls;
pub mod validate;

use anyhow::{Context, Result};
use sppub_core::{ConfigManager, PublishConfig};
use std::path::{Path, PathBuf};

/// An explicit `--config` path, or discovery in `cwd`.
///
/// Returns the config with the directory its relative paths resolve against.
/// Discovery finding nothing is not an error.
pub fn load_config(
    explicit: Option<&Path>,
    cwd: &Path,
) -> Result<Option<(PublishConfig, PathBuf)>> {
    let manager = ConfigManager::new();

    if let Some(path) = explicit {
        let config = manager
            .load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
            _ => cwd.to_path_buf(),
        };
        return Ok(Some((config, dir)));
    }

    match ConfigManager::find_config_file(cwd) {
        Some(path) => {
            let config = manager
                .load(&path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?;
            Ok(Some((config, cwd.to_path_buf())))
        }
        None => Ok(None),
    }
}
