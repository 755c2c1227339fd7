//! `vdpro status`: installed and published versions side by side.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CliConfig, self_updater};

/// Show installed and published versions.
#[derive(Args, Debug)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let updater = self_updater(config).await?;
        let check = updater.check_for_updates().await;

        let latest = check.latest_version.as_deref().filter(|_| check.available);
        println!("{}", format_version_info(updater.current_version(), latest));

        let context = updater.context();
        println!("Executable:      {}", context.executable().display());
        if !context.is_packaged() {
            println!("{}", "Development build: self-update is disabled".yellow());
        }

        Ok(())
    }
}

/// Two-line summary of the installed version and, if newer, the published one.
pub fn format_version_info(current: &str, latest: Option<&str>) -> String {
    match latest {
        Some(v) if v != current => {
            format!("Current version: {current}\nLatest version:  {v} (update available)")
        }
        _ => format!("Current version: {current} (up to date)"),
    }
}
