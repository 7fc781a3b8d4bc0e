//! Urls command - Print the endpoints a publish would call

use anyhow::Result;
use colored::Colorize;
use sppub_core::{CheckinType, SiteEndpoints, DEFAULT_CHECKIN_MESSAGE};

pub async fn run(
    site: &str,
    folder: &str,
    name: &str,
    checkin_type: Option<&str>,
    message: Option<&str>,
) -> Result<()> {
    let endpoints = SiteEndpoints::new(site)?;
    let checkin_type = match checkin_type {
        Some(t) => t.parse::<CheckinType>()?,
        None => CheckinType::default(),
    };

    println!("{}", "🔗 Endpoints".cyan().bold());
    println!(
        "  {} {}",
        "server-relative".yellow(),
        endpoints.server_relative_path(folder, name)
    );
    for (label, url) in endpoints.describe(
        folder,
        name,
        message.unwrap_or(DEFAULT_CHECKIN_MESSAGE),
        checkin_type,
    ) {
        println!("  {} {}", label.yellow(), url);
    }
    println!("  {} {}", "contextinfo".yellow(), endpoints.context_info_url());

    Ok(())
}
