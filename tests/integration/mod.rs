//! Integration test suite for VDPro
//!
//! End-to-end tests of the update core against a local HTTP server and temp
//! files, plus black-box tests of both binaries.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **manifest**: Version check against served manifests, failure transparency
//! - **download**: Staging, integrity, checksum and progress reporting
//! - **installer**: Updater wait, install and timeout behaviour
//! - **updater_cli**: `vdpro-updater` arguments and exit codes
//! - **round_trip**: Download, stage, hand off, install, relaunch
//! - **cli**: `vdpro` commands

mod cli;
mod download;
mod installer;
mod manifest;
mod round_trip;
mod updater_cli;

use std::path::{Path, PathBuf};

/// Write `contents` to `path` and mark it executable.
pub fn write_executable(path: &Path, contents: &[u8]) {
    std::fs::write(path, contents).unwrap();
    vdpro::utils::make_executable(path).unwrap();
}

/// `<dir>/vdpro` (plus the platform suffix).
pub fn app_path(dir: &Path) -> PathBuf {
    dir.join(vdpro::utils::exe_name("vdpro"))
}
