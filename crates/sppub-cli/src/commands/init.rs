//! Init command - Write a starter configuration

use anyhow::Result;
use colored::Colorize;
use sppub_core::{ConfigManager, CONFIG_FILE_NAMES};
use std::path::{Path, PathBuf};

pub const DEFAULT_SITE_URL: &str = "https://contoso.sharepoint.com/sites/dev";

/// Write `sppub.config.yaml` into `dir` unless a config already exists there
pub fn write_starter(dir: &Path, site: Option<&str>, force: bool) -> Result<Option<PathBuf>> {
    if !force && ConfigManager::find_config_file(dir).is_some() {
        return Ok(None);
    }

    let config = ConfigManager::create_default(site.unwrap_or(DEFAULT_SITE_URL));
    let path = dir.join(CONFIG_FILE_NAMES[0]);
    ConfigManager::new().save(&config, &path)?;
    Ok(Some(path))
}

pub async fn run(site: Option<&str>, force: bool) -> Result<()> {
    println!("{}", "🚀 Initializing sppub configuration...".cyan().bold());

    let dir = std::env::current_dir()?;
    match write_starter(&dir, site, force)? {
        Some(path) => {
            println!("  {} Created {}", "✅".green(), path.display());
            println!();
            println!("Next steps:");
            println!("  1. Edit {} to point at your site and files", CONFIG_FILE_NAMES[0]);
            println!("  2. {}", "sppub auth --cookie \"FedAuth=...\"".cyan());
            println!("  3. {}", "sppub publish".cyan());
        }
        None => {
            println!(
                "{} Configuration file already exists (use --force to overwrite)",
                "⚠️".yellow()
            );
        }
    }

    Ok(())
}
