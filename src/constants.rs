//! Global constants used throughout the VDPro update core.
//!
//! Timeouts, retry budgets, chunk sizes and the fixed file names that make up
//! the contract between the primary application and the updater process.

use std::time::Duration;

/// Manifest advertising the latest published version and its download URL.
pub const DEFAULT_MANIFEST_URL: &str = "https://gist.githubusercontent.com/AhmedEssamYassin/19fe6b989b7abf1365d81829957fcac1/raw/version.json";

/// User agent sent with every update request.
pub const USER_AGENT: &str = concat!("vdpro/", env!("CARGO_PKG_VERSION"));

/// Total timeout for the manifest request (3 seconds).
///
/// The version check runs at startup, so it must never hold the caller for
/// long on a flaky network.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Connect timeout for the binary download (10 seconds).
pub const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read timeout for the binary download (60 seconds).
///
/// Applies per read, not to the whole body.
pub const DOWNLOAD_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Size of the slices written to the staging file (8 KiB).
///
/// One progress callback fires per slice.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

/// Number of delete attempts the updater makes on the old executable.
pub const LOCK_WAIT_ATTEMPTS: u32 = 15;

/// Delay between two delete attempts.
pub const LOCK_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Suffix appended to the running executable to form the staging path.
pub const STAGING_SUFFIX: &str = ".new";

/// File stem of the updater binary shipped next to the primary.
pub const UPDATER_BIN_NAME: &str = "vdpro-updater";

/// File stem of the updater copy placed in the temp directory before launch.
pub const UPDATER_TEMP_NAME: &str = "vdpro-updater-run";

/// Lock file guarding against two update attempts at once.
pub const UPDATE_LOCK_FILE: &str = "update.lock";

/// Exit code of the updater when the install finished.
pub const EXIT_OK: i32 = 0;

/// Exit code of the updater on `TimedOut` or `InstallFailed`.
pub const EXIT_INSTALL_FAILURE: i32 = 1;
