//! Auth command - Store or clear session credentials

use crate::config::{Credentials, SettingsManager};
use anyhow::Result;
use colored::Colorize;

pub async fn run(token: Option<String>, cookie: Option<String>, clear: bool) -> Result<()> {
    if clear {
        let path = SettingsManager::save(&Credentials::default())?;
        println!("{} Credentials cleared ({})", "✅".green(), path.display());
        return Ok(());
    }

    if token.is_none() && cookie.is_none() {
        let credentials = SettingsManager::load()?;
        println!(
            "🔑 Current authentication: {}",
            credentials.session_auth().kind().cyan()
        );
        return Ok(());
    }

    let path = SettingsManager::credentials_path()?;
    let credentials = SettingsManager::load_from(&path)?.with_overrides(token, cookie);
    SettingsManager::save_to(&credentials, &path)?;
    println!(
        "{} Saved {} credentials to {}",
        "✅".green(),
        credentials.session_auth().kind(),
        path.display()
    );
    Ok(())
}
