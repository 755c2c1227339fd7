//! `vdpro check`: ask the manifest whether a newer version is published.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CliConfig, self_updater};
use crate::utils::progress::ProgressBar;

/// Check whether a newer version is published.
///
/// A failed check reads the same as "up to date"; run with `--verbose` to
/// see why it failed.
#[derive(Args, Debug)]
pub struct CheckCommand {}

impl CheckCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let updater = self_updater(config).await?;

        let spinner =
            if config.show_progress() { ProgressBar::new_spinner() } else { ProgressBar::hidden() };
        spinner.set_message("Checking for updates...");
        let check = updater.check_for_updates().await;
        spinner.finish_and_clear();

        match check.latest_version {
            Some(latest) if check.available => {
                println!(
                    "{}",
                    format!("Update available: {} -> {}", updater.current_version(), latest)
                        .green()
                );
                println!("Run `vdpro upgrade` to install the latest version");
            }
            _ => {
                println!(
                    "{}",
                    format!("You are on the latest version ({})", updater.current_version())
                        .green()
                );
            }
        }

        Ok(())
    }
}
