//! User configuration for VDPro.
//!
//! Settings live in a single TOML file (`~/.vdpro/config.toml`, or
//! `%LOCALAPPDATA%\vdpro\config.toml` on Windows). The directory holding that
//! file is also the settings directory where the update lock is kept.
//!
//! The configuration is loaded once by the binary and passed explicitly to the
//! services that need it; nothing here is cached in static state.
//!
//! ```toml
//! [upgrade]
//! manifest_url = "https://example.com/vdpro/version.json"
//! check_on_startup = true
//! check_timeout_secs = 3
//! ```

mod global;

pub use global::GlobalConfig;

use anyhow::Result;
use std::path::PathBuf;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "VDPRO_CONFIG";

/// Directory holding the configuration file and the update lock.
///
/// Follows [`GlobalConfig::default_path`], so `VDPRO_CONFIG` moves both.
pub fn settings_dir() -> Result<PathBuf> {
    let path = GlobalConfig::default_path()?;
    Ok(path.parent().map(|p| p.to_path_buf()).unwrap_or_else(|| PathBuf::from(".vdpro")))
}
