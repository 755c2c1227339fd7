//! VideoDownloaderPro updater
//!
//! Started by the application right before it exits:
//!
//! ```text
//! vdpro-updater <OLD_EXE> <NEW_EXE>
//! ```
//!
//! Waits until `OLD_EXE` can be removed, moves `NEW_EXE` into its place and
//! starts it. Exit codes: 0 done, 1 timed out or install failed, 2 usage error.

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use vdpro::config::{GlobalConfig, settings_dir};
use vdpro::constants::EXIT_INSTALL_FAILURE;
use vdpro::core::UpdateError;
use vdpro::upgrade::installer::remove_temp_copy;
use vdpro::upgrade::{ConsoleStatus, Installer, InstallerState, StatusDisplay, UpdateLock};

/// Replace the VideoDownloaderPro executable with a downloaded update.
#[derive(Parser, Debug)]
#[command(name = "vdpro-updater", disable_help_flag = true, disable_version_flag = true)]
struct Args {
    /// Installed executable to replace
    old_executable: PathBuf,

    /// Staged executable to move into place
    new_executable: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let code = run(args).await;
    std::process::exit(code);
}

async fn run(args: Args) -> i32 {
    let status = ConsoleStatus;

    let config = match GlobalConfig::load().await {
        Ok(config) => config.upgrade,
        Err(e) => {
            warn!("Using default settings: {:#}", e);
            GlobalConfig::default().upgrade
        }
    };

    let _lock = match settings_dir() {
        Ok(dir) => {
            match UpdateLock::acquire_with_retry(
                &dir,
                config.lock_wait_attempts,
                config.lock_wait_interval(),
            )
            .await
            {
                Ok(lock) => Some(lock),
                Err(e @ UpdateError::UpdateInProgress { .. }) => {
                    status.show(InstallerState::TimedOut, Some(&e.to_string()));
                    return EXIT_INSTALL_FAILURE;
                }
                Err(e) => {
                    warn!("Continuing without update lock: {}", e);
                    None
                }
            }
        }
        Err(e) => {
            warn!("Continuing without update lock: {:#}", e);
            None
        }
    };

    let state = Installer::new(args.old_executable, args.new_executable)
        .with_retry(config.lock_wait_attempts, config.lock_wait_interval())
        .run(&status)
        .await;
    debug!("Updater finished in state {:?}", state);

    if state == InstallerState::Done {
        remove_temp_copy();
    }

    state.exit_code()
}
