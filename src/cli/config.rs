//! `vdpro config`: view and change settings.
//!
//! ```bash
//! vdpro config show
//! vdpro config path
//! vdpro config set upgrade.check_on_startup false
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::GlobalConfig;

/// Show or change settings.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Print the effective configuration (default)
    Show,

    /// Print the configuration file location
    Path,

    /// Set a value, e.g. `upgrade.check_on_startup false`
    Set {
        /// Dotted key, e.g. `upgrade.manifest_url`
        key: String,
        /// New value
        value: String,
    },
}

impl ConfigCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(config_path).await,
            Some(ConfigSubcommands::Path) => Self::show_path(config_path),
            Some(ConfigSubcommands::Set {
                key,
                value,
            }) => Self::set(config_path, &key, &value).await,
        }
    }

    async fn show(config_path: Option<PathBuf>) -> Result<()> {
        let config = GlobalConfig::load_with_optional(config_path.clone()).await?;
        let path = resolve(config_path)?;

        println!("{}", "Configuration".bold());
        println!("Location: {}", path.display());
        if !path.exists() {
            println!("{}", "(file not found, showing defaults)".dimmed());
        }
        println!();
        println!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);
        Ok(())
    }

    fn show_path(config_path: Option<PathBuf>) -> Result<()> {
        println!("{}", resolve(config_path)?.display());
        Ok(())
    }

    async fn set(config_path: Option<PathBuf>, key: &str, value: &str) -> Result<()> {
        let path = resolve(config_path)?;
        let mut config = GlobalConfig::load_with_optional(Some(path.clone())).await?;

        config.set_value(key, value)?;
        config.save_to(&path).await?;

        println!("{} {} = {}", "✓".green(), key, value);
        Ok(())
    }
}

fn resolve(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => GlobalConfig::default_path(),
    }
}
