//! Global configuration file handling.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.vdpro/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\vdpro\config.toml`
//!
//! The location can be overridden with the `VDPRO_CONFIG` environment variable,
//! which the updater process inherits. The `--config` flag of `vdpro` only
//! applies to that invocation.
//!
//! A missing file is not an error: defaults are used until the user saves.

use crate::upgrade::config::UpgradeConfig;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::CONFIG_PATH_ENV;

/// Root of the user configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Self-update settings (`[upgrade]` table).
    #[serde(default)]
    pub upgrade: UpgradeConfig,
}

impl GlobalConfig {
    /// Load the configuration from the default location, or defaults if absent.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load the configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load from `path` if given, else from the default location.
    ///
    /// A missing file yields the defaults either way.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Save the configuration to a specific file, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Path of the configuration file, honouring `VDPRO_CONFIG`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("vdpro")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".vdpro")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Set a single value addressed by a dotted key, e.g. `upgrade.check_on_startup`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let upgrade = &mut self.upgrade;
        match key {
            "upgrade.manifest_url" => upgrade.manifest_url = value.to_string(),
            "upgrade.check_on_startup" => upgrade.check_on_startup = parse_value(key, value)?,
            "upgrade.check_timeout_secs" => upgrade.check_timeout_secs = parse_value(key, value)?,
            "upgrade.connect_timeout_secs" => {
                upgrade.connect_timeout_secs = parse_value(key, value)?;
            }
            "upgrade.read_timeout_secs" => upgrade.read_timeout_secs = parse_value(key, value)?,
            "upgrade.lock_wait_attempts" => upgrade.lock_wait_attempts = parse_value(key, value)?,
            "upgrade.lock_wait_interval_ms" => {
                upgrade.lock_wait_interval_ms = parse_value(key, value)?;
            }
            _ => bail!("Unknown configuration key '{key}'"),
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().with_context(|| format!("Invalid value '{value}' for '{key}'"))
}
