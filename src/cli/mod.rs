//! Command-line interface for VideoDownloaderPro.
//!
//! The desktop window is not part of this crate; the `vdpro` binary exposes the
//! update core through a small set of commands instead.
//!
//! # Commands
//!
//! - `check` - Ask the manifest whether a newer version exists
//! - `status` - Show the installed and published versions
//! - `upgrade` - Download the newest version and hand off to the updater
//! - `config` - Show or change settings
//!
//! Run without a command, `vdpro` starts up as the application would: it
//! prints its version and, when `upgrade.check_on_startup` is enabled, checks
//! for updates in the background.
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet`: log level (`debug` / `error`, default `info`)
//! - `--config <PATH>`: configuration file (also `VDPRO_CONFIG`)
//! - `--no-progress`: hide progress bars and spinners (also `VDPRO_NO_PROGRESS`)

mod check;
mod config;
mod status;
mod upgrade;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::{CONFIG_PATH_ENV, GlobalConfig};
use crate::upgrade::{InstallContext, SelfUpdater};
use crate::utils::progress::NO_PROGRESS_ENV;

/// Settings derived from the global flags, shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: &'static str,
    /// Hide progress indicators.
    pub no_progress: bool,
    /// Configuration file given with `--config` / `VDPRO_CONFIG`.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Resolved configuration file path.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => GlobalConfig::default_path(),
        }
    }

    /// Directory holding the configuration file and the update lock.
    pub fn settings_dir(&self) -> Result<PathBuf> {
        let path = self.config_path()?;
        path.parent()
            .map(|p| p.to_path_buf())
            .with_context(|| format!("Configuration path has no parent: {}", path.display()))
    }

    /// Load the configuration file, or the defaults when it does not exist.
    pub async fn load(&self) -> Result<GlobalConfig> {
        GlobalConfig::load_with_optional(self.config_path.clone()).await
    }

    /// Whether progress indicators should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.no_progress
    }
}

/// VideoDownloaderPro command line.
#[derive(Parser, Debug)]
#[command(
    name = "vdpro",
    about = "VideoDownloaderPro - download videos with yt-dlp",
    version,
    long_about = "VideoDownloaderPro downloads videos with yt-dlp and keeps itself up to date."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Disable progress bars and spinners
    #[arg(
        long,
        global = true,
        env = NO_PROGRESS_ENV,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether a newer version is published
    Check(check::CheckCommand),

    /// Show installed and published versions
    Status(status::StatusCommand),

    /// Download the newest version and restart into it
    Upgrade(upgrade::UpgradeCommand),

    /// Show or change settings
    Config(config::ConfigCommand),
}

impl Cli {
    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Some(Commands::Check(cmd)) => cmd.execute(&config).await,
            Some(Commands::Status(cmd)) => cmd.execute(&config).await,
            Some(Commands::Upgrade(cmd)) => cmd.execute(&config).await,
            Some(Commands::Config(cmd)) => cmd.execute(config.config_path.clone()).await,
            None => startup(&config).await,
        }
    }
}

/// Build the updater for the running process from the loaded settings.
pub(crate) async fn self_updater(config: &CliConfig) -> Result<SelfUpdater> {
    let settings = config.load().await?;
    let context = InstallContext::detect().context("Failed to inspect the running executable")?;
    debug!("Install context: {:?}", context);

    Ok(SelfUpdater::new(settings.upgrade, context)
        .with_lock_dir(config.settings_dir()?)
        .with_config_path(config.config_path.clone()))
}

/// What the application does when launched without a command.
async fn startup(config: &CliConfig) -> Result<()> {
    let settings = config.load().await?;
    println!("VideoDownloaderPro {}", env!("CARGO_PKG_VERSION"));

    if !settings.upgrade.check_on_startup {
        debug!("Startup update check disabled");
        return Ok(());
    }

    let updater = Arc::new(self_updater(config).await?);
    let check = updater.clone().spawn_check().await.context("Update check task failed")?;

    if check.available
        && let Some(latest) = check.latest_version
    {
        println!(
            "{} {} -> {}. Run {} to install it.",
            "Update available:".green().bold(),
            updater.current_version(),
            latest,
            "vdpro upgrade".cyan()
        );
    }

    Ok(())
}
