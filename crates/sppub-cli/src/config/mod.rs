//! Credential settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sppub_http::SessionAuth;
use std::path::{Path, PathBuf};

/// Session material saved between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl Credentials {
    /// Environment values win over stored ones
    pub fn with_overrides(mut self, token: Option<String>, cookie: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.token = Some(token);
        }
        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            self.cookie = Some(cookie);
        }
        self
    }

    /// A bearer token takes precedence over a cookie
    pub fn session_auth(&self) -> SessionAuth {
        match (&self.token, &self.cookie) {
            (Some(token), _) => SessionAuth::Bearer(token.clone()),
            (None, Some(cookie)) => SessionAuth::Cookie(cookie.clone()),
            (None, None) => SessionAuth::None,
        }
    }
}

pub struct SettingsManager;

impl SettingsManager {
    /// Get the sppub home directory (~/.sppub)
    pub fn sppub_home() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("SPPUB_HOME") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".sppub"))
    }

    pub fn credentials_path() -> Result<PathBuf> {
        Ok(Self::sppub_home()?.join("credentials.json"))
    }

    /// Stored credentials overlaid with `SPPUB_TOKEN` / `SPPUB_COOKIE`
    pub fn load() -> Result<Credentials> {
        let stored = Self::load_from(&Self::credentials_path()?)?;
        Ok(stored.with_overrides(
            std::env::var("SPPUB_TOKEN").ok(),
            std::env::var("SPPUB_COOKIE").ok(),
        ))
    }

    pub fn load_from(path: &Path) -> Result<Credentials> {
        if !path.exists() {
            return Ok(Credentials::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credentials from {:?}", path))
    }

    pub fn save(credentials: &Credentials) -> Result<PathBuf> {
        let path = Self::credentials_path()?;
        Self::save_to(credentials, &path)?;
        Ok(path)
    }

    pub fn save_to(credentials: &Credentials, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(credentials).context("Failed to serialize credentials")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write credentials to {:?}", path))?;

        // Set permissions on Unix (restrict to owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }
}
