use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    CHECK_TIMEOUT, DEFAULT_MANIFEST_URL, DOWNLOAD_CONNECT_TIMEOUT, DOWNLOAD_READ_TIMEOUT,
    LOCK_WAIT_ATTEMPTS, LOCK_WAIT_INTERVAL,
};

/// Configuration settings for VDPro self-update behavior.
///
/// Stored as the `[upgrade]` table of the user configuration file. Every field
/// has a default, so a partial table (or no table at all) is valid.
///
/// # TOML Example
/// ```toml
/// [upgrade]
/// manifest_url = "https://example.com/vdpro/version.json"
/// check_on_startup = true
/// check_timeout_secs = 3
/// connect_timeout_secs = 10
/// read_timeout_secs = 60
/// lock_wait_attempts = 15
/// lock_wait_interval_ms = 1000
/// ```
///
/// # Examples
///
/// ```rust,no_run
/// use vdpro::upgrade::config::UpgradeConfig;
///
/// let config = UpgradeConfig::default();
/// assert!(config.check_on_startup);
/// assert_eq!(config.check_timeout().as_secs(), 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpgradeConfig {
    /// URL of the version manifest.
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Whether the application checks for a newer version when it starts.
    ///
    /// # Default: `true`
    #[serde(default = "default_check_on_startup")]
    pub check_on_startup: bool,

    /// Total timeout of the manifest request, in seconds.
    ///
    /// # Default: `3`
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    /// Connect timeout of the binary download, in seconds.
    ///
    /// # Default: `10`
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-read timeout of the binary download, in seconds.
    ///
    /// The body can be large, so this bounds stalls rather than total time.
    ///
    /// # Default: `60`
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// How many times the updater tries to remove the old executable.
    ///
    /// # Default: `15`
    #[serde(default = "default_lock_wait_attempts")]
    pub lock_wait_attempts: u32,

    /// Delay between two removal attempts, in milliseconds.
    ///
    /// # Default: `1000`
    #[serde(default = "default_lock_wait_interval_ms")]
    pub lock_wait_interval_ms: u64,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            check_on_startup: default_check_on_startup(),
            check_timeout_secs: default_check_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            lock_wait_attempts: default_lock_wait_attempts(),
            lock_wait_interval_ms: default_lock_wait_interval_ms(),
        }
    }
}

fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.to_string()
}

fn default_check_on_startup() -> bool {
    true
}

fn default_check_timeout_secs() -> u64 {
    CHECK_TIMEOUT.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    DOWNLOAD_CONNECT_TIMEOUT.as_secs()
}

fn default_read_timeout_secs() -> u64 {
    DOWNLOAD_READ_TIMEOUT.as_secs()
}

fn default_lock_wait_attempts() -> u32 {
    LOCK_WAIT_ATTEMPTS
}

fn default_lock_wait_interval_ms() -> u64 {
    LOCK_WAIT_INTERVAL.as_millis() as u64
}

impl UpgradeConfig {
    /// Create an `UpgradeConfig` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total timeout of the manifest request.
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    /// Connect timeout of the binary download.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-read timeout of the binary download.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Delay between two removal attempts in the updater.
    pub fn lock_wait_interval(&self) -> Duration {
        Duration::from_millis(self.lock_wait_interval_ms)
    }
}
