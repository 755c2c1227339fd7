//! VideoDownloaderPro - self-update core
//!
//! VideoDownloaderPro is a desktop front end for yt-dlp distributed as a single
//! executable. This crate holds the part that keeps that executable current:
//! a version check against a remote manifest, a background download of the
//! new binary, and a handoff to a small companion process that swaps the
//! files once the application has exited.
//!
//! # Architecture Overview
//!
//! Two binaries cooperate:
//!
//! - `vdpro`, the application. It checks the manifest, downloads the new
//!   binary to `<executable>.new`, copies `vdpro-updater` to the temp
//!   directory, launches it detached and exits.
//! - `vdpro-updater`, started as `vdpro-updater <OLD_EXE> <NEW_EXE>`. It
//!   retries deleting the old executable until the application has released
//!   it, moves the new one into place and starts it.
//!
//! # Core Modules
//!
//! - [`upgrade`] - Manifest check, download, handoff and the updater state machine
//! - [`config`] - User configuration (`~/.vdpro/config.toml`)
//! - [`core`] - Error types and user-facing error rendering
//! - [`cli`] - Command-line surface of the `vdpro` binary
//! - [`utils`] - Detached process launch, permissions, progress bars
//! - [`constants`] - Timeouts, retry budgets and fixed file names
//!
//! # Configuration
//!
//! ```toml
//! [upgrade]
//! manifest_url = "https://example.com/vdpro/version.json"
//! check_on_startup = true
//! lock_wait_attempts = 15
//! lock_wait_interval_ms = 1000
//! ```
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "latest_version": "2.1.0",
//!   "download_url": "https://example.com/vdpro-2.1.0",
//!   "sha256": "optional hex digest"
//! }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
