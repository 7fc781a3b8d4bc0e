//! Validate command - Validate configuration

use anyhow::{Context, Result};
use colored::Colorize;
use sppub_core::ConfigManager;
use std::path::Path;

pub async fn run(config: Option<&Path>) -> Result<()> {
    println!("{}", "🔍 Validating sppub configuration...".cyan().bold());

    let cwd = std::env::current_dir()?;
    let (config, base_dir) = super::load_config(config, &cwd)?
        .context("No sppub.config.yaml, .yml or .json found")?;

    println!("  📁 Base directory: {}", base_dir.display().to_string().dimmed());
    println!("  🌐 Site: {}", config.site_url.cyan());
    println!();

    let result = ConfigManager::new().validate(&config);

    if result.valid {
        println!("  {} Schema is valid", "✅".green());
    } else {
        println!("  {} Schema validation failed", "❌".red());
        for error in &result.errors {
            println!("      {} {}: {}", "•".red(), error.field.red(), error.message);
        }
    }

    for warning in &result.warnings {
        println!("  {} {}: {}", "⚠️".yellow(), warning.field.yellow(), warning.message);
        if let Some(ref suggestion) = warning.suggestion {
            println!("      💡 {}", suggestion.dimmed());
        }
    }

    println!();

    if !result.valid {
        println!("{}", "❌ Validation failed - please fix the errors above".red().bold());
        anyhow::bail!("Validation failed");
    }

    // Resolving touches the disk only, nothing is sent
    match sppub_core::resolve(&config.sources, &base_dir) {
        Ok(files) if files.is_empty() => {
            println!("  {} Sources currently match no files", "⚠️".yellow());
        }
        Ok(files) => {
            println!("  {} Sources match {} file(s)", "✅".green(), files.len());
        }
        Err(e) => {
            println!("  {} {}", "❌".red(), e);
            anyhow::bail!("Validation failed");
        }
    }

    println!("{}", "✅ Configuration is valid!".green().bold());
    Ok(())
}
