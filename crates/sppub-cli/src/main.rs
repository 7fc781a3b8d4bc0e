//! sppub CLI
//!
//! Publish local files to SharePoint-style document libraries.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "sppub")]
#[command(author, version, about = "sppub - Publish files to SharePoint document libraries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files to the configured site
    Publish {
        /// Config file (default: sppub.config.* in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Site URL, e.g. https://contoso.sharepoint.com/sites/dev
        #[arg(long)]
        site: Option<String>,

        /// Destination folder for --glob sources
        #[arg(short, long)]
        folder: Option<String>,

        /// Glob pattern of files to upload (repeatable)
        #[arg(short, long = "glob")]
        glob: Vec<String>,

        /// Local directory the folder structure is taken relative to
        #[arg(long)]
        base: Option<PathBuf>,

        /// Check files in after upload
        #[arg(long)]
        checkin: bool,

        /// Checkin type: minor, major, overwrite or none
        #[arg(long)]
        checkin_type: Option<String>,

        /// Checkin comment
        #[arg(short, long)]
        message: Option<String>,

        /// Publish all files concurrently
        #[arg(long)]
        parallel: bool,
    },

    /// Validate configuration
    Validate {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a starter sppub.config.yaml
    Init {
        #[arg(long)]
        site: Option<String>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Print the endpoints used for one file (no network)
    Urls {
        #[arg(long)]
        site: String,

        #[arg(short, long, default_value = "")]
        folder: String,

        #[arg(short, long)]
        name: String,

        #[arg(long)]
        checkin_type: Option<String>,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// Store session credentials (or show which are active)
    Auth {
        /// OAuth access token
        #[arg(long)]
        token: Option<String>,

        /// Raw Cookie header, e.g. "FedAuth=...; rtFa=..."
        #[arg(long)]
        cookie: Option<String>,

        /// Remove stored credentials
        #[arg(long, conflicts_with_all = ["token", "cookie"])]
        clear: bool,
    },
}

fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "sppub_cli=debug,sppub_core=debug,sppub_http=debug"
    } else {
        "sppub_cli=info,sppub_core=info,sppub_http=warn"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!("Starting sppub");

    let result = match cli.command {
        Commands::Publish {
            config,
            site,
            folder,
            glob,
            base,
            checkin,
            checkin_type,
            message,
            parallel,
        } => {
            commands::publish::run(commands::publish::PublishArgs {
                config,
                site,
                folder,
                globs: glob,
                base,
                checkin,
                checkin_type,
                message,
                parallel,
            })
            .await
        }
        Commands::Validate { config } => commands::validate::run(config.as_deref()).await,
        Commands::Init { site, force } => commands::init::run(site.as_deref(), force).await,
        Commands::Urls {
            site,
            folder,
            name,
            checkin_type,
            message,
        } => {
            commands::urls::run(
                &site,
                &folder,
                &name,
                checkin_type.as_deref(),
                message.as_deref(),
            )
            .await
        }
        Commands::Auth {
            token,
            cookie,
            clear,
        } => commands::auth::run(token, cookie, clear).await,
    };

    if let Err(ref e) = result {
        error!("Command failed: {:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}
