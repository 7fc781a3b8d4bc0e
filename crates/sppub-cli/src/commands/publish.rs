//! Publish command - Upload files to a document library

use crate::config::SettingsManager;
use anyhow::{Context, Result};
use colored::Colorize;
use sppub_core::{
    publish_all, resolve, BatchSummary, CheckinType, ConfigManager, DispatchMode, FileSource,
    PublishConfig, Publisher,
};
use sppub_http::HttpClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Command line values; each one set overrides the config file
#[derive(Debug, Default)]
pub struct PublishArgs {
    pub config: Option<PathBuf>,
    pub site: Option<String>,
    pub folder: Option<String>,
    pub globs: Vec<String>,
    pub base: Option<PathBuf>,
    pub checkin: bool,
    pub checkin_type: Option<String>,
    pub message: Option<String>,
    pub parallel: bool,
}

/// Merge flags into `config`.
///
/// `--glob` replaces the configured sources with one glob source built from
/// `--glob`, `--folder` and `--base`.
pub fn apply_overrides(config: &mut PublishConfig, args: &PublishArgs) -> Result<()> {
    if let Some(ref site) = args.site {
        config.site_url = site.clone();
    }
    if !args.globs.is_empty() {
        config.sources = vec![FileSource::glob(
            args.globs.clone(),
            args.folder.clone().unwrap_or_default(),
            args.base.clone(),
        )];
    }
    if args.checkin {
        config.checkin = true;
    }
    if let Some(ref checkin_type) = args.checkin_type {
        config.checkin_type = Some(checkin_type.parse::<CheckinType>()?);
    }
    if let Some(ref message) = args.message {
        config.checkin_message = message.clone();
    }
    if args.parallel {
        config.dispatch = DispatchMode::Parallel;
    }
    Ok(())
}

/// Directory sources resolve against: the shell's cwd for `--glob`,
/// otherwise the directory of the config file
pub fn source_root<'a>(args: &PublishArgs, config_dir: &'a Path, cwd: &'a Path) -> &'a Path {
    if args.globs.is_empty() {
        config_dir
    } else {
        cwd
    }
}

pub async fn run(args: PublishArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;

    let (mut config, base_dir) = match super::load_config(args.config.as_deref(), &cwd)? {
        Some(found) => found,
        None => {
            let site = args
                .site
                .clone()
                .context("No sppub.config.* found; pass --site to publish without one")?;
            (PublishConfig::new(site), cwd.clone())
        }
    };
    apply_overrides(&mut config, &args)?;

    let validation = ConfigManager::new().validate(&config);
    for warning in &validation.warnings {
        println!("  {} {}: {}", "⚠️".yellow(), warning.field.yellow(), warning.message);
    }
    if !validation.valid {
        for error in &validation.errors {
            println!("  {} {}: {}", "•".red(), error.field.red(), error.message);
        }
        anyhow::bail!("Invalid configuration");
    }

    let files = resolve(&config.sources, source_root(&args, &base_dir, &cwd))?;
    debug!("{} file(s) resolved", files.len());

    let credentials = SettingsManager::load()?;
    let auth = credentials.session_auth();
    info!("Using {} authentication", auth.kind());
    let client = HttpClient::new(auth)?;

    println!(
        "{} {}",
        "📤 Publishing to".cyan().bold(),
        config.site_url.cyan()
    );

    let publisher = Publisher::new(Arc::new(client));
    let options = config.core_options();
    let summary = publish_all(&publisher, files, &options, config.dispatch).await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    for result in &summary.results {
        let path = if result.folder.is_empty() {
            result.name.clone()
        } else {
            format!("{}/{}", result.folder, result.name)
        };
        if result.outcome.is_skipped() {
            println!("  {} {} {}", "○".dimmed(), path.dimmed(), result.outcome.as_str().dimmed());
        } else {
            println!("  {} {} {}", "✅".green(), path, result.outcome.as_str().dimmed());
        }
    }

    println!();
    println!(
        "{} {} published, {} skipped in {}ms",
        "✨".green(),
        summary.published().to_string().green().bold(),
        summary.skipped(),
        summary.duration_ms
    );
}
