//! Configuration management for sppub

use crate::endpoints::SiteEndpoints;
use crate::error::{PublishError, Result};
use crate::sources::FileSource;
use crate::types::{
    CheckinType, CoreOptions, DispatchMode, MetadataPatches, ValidationError, ValidationResult,
    ValidationWarning, DEFAULT_CHECKIN_MESSAGE,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] =
    &["sppub.config.yaml", "sppub.config.yml", "sppub.config.json"];

fn default_checkin_message() -> String {
    DEFAULT_CHECKIN_MESSAGE.to_string()
}

/// Contents of an `sppub.config.*` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    pub site_url: String,
    #[serde(default)]
    pub checkin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkin_type: Option<CheckinType>,
    #[serde(default = "default_checkin_message")]
    pub checkin_message: String,
    #[serde(default)]
    pub dispatch: DispatchMode,
    #[serde(default)]
    pub sources: Vec<FileSource>,
    /// List item fields to set, keyed by file name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl PublishConfig {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            checkin: false,
            checkin_type: None,
            checkin_message: default_checkin_message(),
            dispatch: DispatchMode::default(),
            sources: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Options for one publish run; every call starts with fresh metadata flags
    pub fn core_options(&self) -> CoreOptions {
        let metadata = MetadataPatches::new();
        for (file_name, fields) in &self.metadata {
            metadata.insert(file_name.clone(), fields.clone());
        }

        let mut options = CoreOptions::new(self.site_url.clone())
            .with_checkin_message(self.checkin_message.clone())
            .with_metadata(metadata);
        options.checkin = self.checkin;
        options.checkin_type = self.checkin_type.unwrap_or_default();
        options
    }
}

/// Configuration manager for loading and saving publish configurations
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Find configuration file in a directory
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Load configuration from a file
    pub fn load(&self, config_path: &Path) -> Result<PublishConfig> {
        let content = std::fs::read_to_string(config_path)?;
        let config: PublishConfig = if is_json(config_path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(config)
    }

    /// Load configuration from a directory (searches for config files)
    pub fn load_from_directory(&self, dir: &Path) -> Result<(PublishConfig, PathBuf)> {
        let config_path = Self::find_config_file(dir)
            .ok_or_else(|| PublishError::ConfigNotFound(dir.display().to_string()))?;

        let config = self.load(&config_path)?;
        Ok((config, config_path))
    }

    pub fn validate(&self, config: &PublishConfig) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if config.site_url.trim().is_empty() {
            result = result.with_error(ValidationError {
                field: "site_url".to_string(),
                message: "Site URL is required".to_string(),
                code: "MISSING_SITE_URL".to_string(),
            });
        } else if let Err(e) = SiteEndpoints::new(&config.site_url) {
            result = result.with_error(ValidationError {
                field: "site_url".to_string(),
                message: e.to_string(),
                code: "INVALID_SITE_URL".to_string(),
            });
        }

        if config.sources.is_empty() {
            result = result.with_warning(ValidationWarning {
                field: "sources".to_string(),
                message: "No sources configured".to_string(),
                suggestion: Some("Add a glob source or pass --glob on the command line".to_string()),
            });
        }

        for (index, source) in config.sources.iter().enumerate() {
            match source {
                FileSource::Content { file_name, .. } => {
                    if file_name.trim().is_empty() {
                        result = result.with_error(ValidationError {
                            field: format!("sources[{}].file_name", index),
                            message: "File name must not be empty".to_string(),
                            code: "EMPTY_FILE_NAME".to_string(),
                        });
                    } else if file_name.contains('/') || file_name.contains('\\') {
                        result = result.with_error(ValidationError {
                            field: format!("sources[{}].file_name", index),
                            message: "File name must not contain path separators".to_string(),
                            code: "INVALID_FILE_NAME".to_string(),
                        });
                    }
                }
                FileSource::Glob { patterns, .. } => {
                    if patterns.iter().all(|p| p.trim().is_empty()) {
                        result = result.with_error(ValidationError {
                            field: format!("sources[{}].glob", index),
                            message: "Glob source needs at least one pattern".to_string(),
                            code: "EMPTY_GLOB".to_string(),
                        });
                    }
                }
            }
        }

        if !config.checkin && config.checkin_type.is_some() {
            result = result.with_warning(ValidationWarning {
                field: "checkin_type".to_string(),
                message: "checkin_type has no effect while checkin is false".to_string(),
                suggestion: Some("Set 'checkin: true' or remove checkin_type".to_string()),
            });
        }

        // Only knowable when no glob source is involved
        let known: Option<HashSet<&str>> = config
            .sources
            .iter()
            .map(FileSource::static_file_name)
            .collect();
        if let Some(known) = known {
            for file_name in config.metadata.keys() {
                if !known.contains(file_name.as_str()) {
                    result = result.with_warning(ValidationWarning {
                        field: format!("metadata.{}", file_name),
                        message: format!("No source produces a file named '{}'", file_name),
                        suggestion: None,
                    });
                }
            }
        }

        result
    }

    /// Save configuration to a file
    pub fn save(&self, config: &PublishConfig, config_path: &Path) -> Result<()> {
        let content = if is_json(config_path) {
            serde_json::to_string_pretty(config)?
        } else {
            serde_yaml::to_string(config)?
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, content)?;

        Ok(())
    }

    /// Starter configuration publishing `dist/` into Site Assets
    pub fn create_default(site_url: &str) -> PublishConfig {
        let mut config = PublishConfig::new(site_url);
        config.sources.push(FileSource::glob(
            vec!["dist/**/*".to_string()],
            "SiteAssets",
            Some(PathBuf::from("dist")),
        ));
        config
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}
