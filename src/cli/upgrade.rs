//! `vdpro upgrade`: download the newest version and restart into it.
//!
//! The command checks the manifest, asks for confirmation, downloads the new
//! binary next to the installed one on a background task while a progress bar
//! follows its events, then launches the updater and exits. The updater
//! replaces the executable once this process is gone and starts the new
//! version.
//!
//! ```bash
//! vdpro upgrade          # asks before downloading
//! vdpro upgrade --yes    # no prompt
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CliConfig, self_updater};
use crate::upgrade::ChannelObserver;
use crate::utils::progress::{ProgressBar, ProgressObserver};

/// Download the newest version and restart into it.
#[derive(Args, Debug)]
pub struct UpgradeCommand {
    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

impl UpgradeCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let updater = self_updater(config).await?;

        let spinner =
            if config.show_progress() { ProgressBar::new_spinner() } else { ProgressBar::hidden() };
        spinner.set_message("Checking for updates...");
        let check = updater.check_for_updates().await;
        spinner.finish_and_clear();

        let Some(latest) = check.latest_version.clone().filter(|_| check.available) else {
            println!(
                "{}",
                format!("Already on the latest version ({})", updater.current_version()).green()
            );
            return Ok(());
        };

        println!("Update available: {} -> {}", updater.current_version(), latest.bold());

        if !self.yes && !confirm(&latest).await? {
            println!("{}", "Upgrade cancelled.".yellow());
            return Ok(());
        }

        println!("{}", format!("Upgrading to version {latest}...").cyan());
        let progress = ProgressObserver::new(&latest, config.show_progress());
        let (events, mut rx) = ChannelObserver::new();
        let task = Arc::new(updater).spawn_install(check, Arc::new(events));

        while let Some(event) = rx.recv().await {
            event.dispatch(&progress);
        }

        match task.await.context("Upgrade task failed")? {
            Ok(never) => match never {},
            Err(e) => Err(e).context("Upgrade failed"),
        }
    }
}

/// Ask `[Y/n]` on an interactive terminal. Non-interactive sessions decline.
async fn confirm(version: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        eprintln!("{}", "Not running interactively.".yellow());
        eprintln!("Run {} to upgrade without a prompt.", "vdpro upgrade --yes".cyan());
        return Ok(false);
    }

    print!("{} ", format!("Install version {version} now? [Y/n]:").green());
    std::io::stdout().flush()?;

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut response = String::new();
    reader.read_line(&mut response).await?;

    Ok(is_yes(&response))
}

fn is_yes(response: &str) -> bool {
    let response = response.trim().to_lowercase();
    response.is_empty() || response == "y" || response == "yes"
}
