//! The updater's install state machine.
//!
//! ```text
//! WaitingForLock ──(old removed)──▶ Installing ──(moved)──▶ Relaunching ──▶ Done
//!       │                               │
//!       └─(budget exhausted)─▶ TimedOut └─(move failed)─▶ InstallFailed
//! ```
//!
//! The old executable counts as released once it can be deleted (or is
//! already gone). Nothing is moved before that, so a timeout leaves the
//! installation untouched. A failed move after the delete leaves no
//! executable behind; the staged `.new` file is kept so the install can be
//! repeated by hand. Once the binary is in place, failing to mark it
//! executable is only logged.

use colored::Colorize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::{EXIT_INSTALL_FAILURE, EXIT_OK, LOCK_WAIT_ATTEMPTS, LOCK_WAIT_INTERVAL};
use crate::utils::platform::{make_executable, spawn_detached};

/// Phase of the updater process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerState {
    /// Waiting for the primary to release the old executable.
    WaitingForLock,
    /// Moving the staged binary into place.
    Installing,
    /// Starting the updated application.
    Relaunching,
    /// Finished.
    Done,
    /// The old executable stayed locked for the whole wait budget.
    TimedOut,
    /// The staged binary could not be put in place.
    InstallFailed,
}

impl InstallerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::TimedOut | Self::InstallFailed)
    }

    /// Process exit code for a terminal state.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Done => EXIT_OK,
            _ => EXIT_INSTALL_FAILURE,
        }
    }

    /// Short status line shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            Self::WaitingForLock => "Waiting for VideoDownloaderPro to close...",
            Self::Installing => "Installing update...",
            Self::Relaunching => "Restarting VideoDownloaderPro...",
            Self::Done => "Update complete",
            Self::TimedOut => "Timed out waiting for VideoDownloaderPro to close",
            Self::InstallFailed => "Update failed",
        }
    }
}

impl fmt::Display for InstallerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// File operations the installer performs.
pub trait InstallFs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    fn set_executable(&self, path: &Path) -> io::Result<()> {
        make_executable(path)
    }
}

/// [`InstallFs`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl InstallFs for StdFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        std::fs::copy(from, to)
    }
}

/// Receives every phase change of the installer.
pub trait StatusDisplay: Send + Sync {
    fn show(&self, state: InstallerState, detail: Option<&str>);
}

/// Prints phases to stdout, failures to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleStatus;

impl StatusDisplay for ConsoleStatus {
    fn show(&self, state: InstallerState, detail: Option<&str>) {
        match (state, detail) {
            (InstallerState::TimedOut | InstallerState::InstallFailed, Some(detail)) => {
                eprintln!("{} {}: {}", "✗".red(), state.message().red(), detail);
            }
            (InstallerState::TimedOut | InstallerState::InstallFailed, None) => {
                eprintln!("{} {}", "✗".red(), state.message().red());
            }
            (InstallerState::Done, _) => println!("{} {}", "✓".green(), state.message()),
            (_, _) => println!("{}", state.message()),
        }
    }
}

/// Replaces `old` with `new`, then relaunches `old`.
pub struct Installer<F: InstallFs = StdFs> {
    old_executable: PathBuf,
    new_executable: PathBuf,
    max_attempts: u32,
    retry_interval: Duration,
    relaunch: bool,
    fs: F,
}

impl Installer<StdFs> {
    pub fn new(old_executable: PathBuf, new_executable: PathBuf) -> Self {
        Self {
            old_executable,
            new_executable,
            max_attempts: LOCK_WAIT_ATTEMPTS,
            retry_interval: LOCK_WAIT_INTERVAL,
            relaunch: true,
            fs: StdFs,
        }
    }
}

impl<F: InstallFs> Installer<F> {
    /// Set the delete-retry budget.
    pub fn with_retry(mut self, max_attempts: u32, retry_interval: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_interval = retry_interval;
        self
    }

    /// Replace the file operations.
    pub fn with_fs<G: InstallFs>(self, fs: G) -> Installer<G> {
        Installer {
            old_executable: self.old_executable,
            new_executable: self.new_executable,
            max_attempts: self.max_attempts,
            retry_interval: self.retry_interval,
            relaunch: self.relaunch,
            fs,
        }
    }

    /// Whether to start the installed executable afterwards.
    pub fn relaunch(mut self, relaunch: bool) -> Self {
        self.relaunch = relaunch;
        self
    }

    /// Run to a terminal state.
    pub async fn run(&self, status: &dyn StatusDisplay) -> InstallerState {
        status.show(InstallerState::WaitingForLock, None);

        if !self.fs.exists(&self.new_executable) {
            let detail = format!("staged file {} not found", self.new_executable.display());
            warn!("{}", detail);
            status.show(InstallerState::InstallFailed, Some(&detail));
            return InstallerState::InstallFailed;
        }

        if let Err(e) = self.wait_for_release().await {
            let detail = format!(
                "{} still in use after {} attempts: {}",
                self.old_executable.display(),
                self.max_attempts,
                e
            );
            warn!("{}", detail);
            status.show(InstallerState::TimedOut, Some(&detail));
            return InstallerState::TimedOut;
        }

        status.show(InstallerState::Installing, None);
        if let Err(e) = self.install() {
            let detail = format!(
                "could not move {} to {}: {}",
                self.new_executable.display(),
                self.old_executable.display(),
                e
            );
            warn!("{}", detail);
            status.show(InstallerState::InstallFailed, Some(&detail));
            return InstallerState::InstallFailed;
        }

        if self.relaunch {
            status.show(InstallerState::Relaunching, None);
            match spawn_detached(&self.old_executable, std::iter::empty::<&str>()) {
                Ok(_) => info!("Relaunched {}", self.old_executable.display()),
                Err(e) => warn!("Failed to relaunch {}: {}", self.old_executable.display(), e),
            }
        }

        status.show(InstallerState::Done, None);
        InstallerState::Done
    }

    /// Delete the old executable, retrying while it is held open.
    async fn wait_for_release(&self) -> io::Result<()> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.fs.remove_file(&self.old_executable) {
                Ok(()) => {
                    debug!("Removed {} on attempt {}", self.old_executable.display(), attempt);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("{} already gone", self.old_executable.display());
                    return Ok(());
                }
                Err(e) => {
                    debug!("Attempt {}/{} to remove old executable: {}", attempt, self.max_attempts, e);
                    last_error = Some(e);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_interval).await;
            }
        }

        Err(last_error.unwrap_or_else(|| io::Error::other("no attempts made")))
    }

    /// Move the staged file into place, copying when a rename is impossible.
    fn install(&self) -> io::Result<()> {
        if let Err(e) = self.fs.rename(&self.new_executable, &self.old_executable) {
            debug!("Rename failed ({}), falling back to copy", e);
            self.fs.copy(&self.new_executable, &self.old_executable)?;
            if let Err(e) = self.fs.remove_file(&self.new_executable) {
                warn!("Failed to remove {}: {}", self.new_executable.display(), e);
            }
        }

        if let Err(e) = self.fs.set_executable(&self.old_executable) {
            warn!("Failed to mark {} executable: {}", self.old_executable.display(), e);
        }
        info!("Installed {}", self.old_executable.display());
        Ok(())
    }
}

/// Remove the running updater if it is the temp-dir copy made by the handoff.
///
/// Unix only; a running executable cannot be deleted on Windows.
pub fn remove_temp_copy() {
    #[cfg(unix)]
    {
        use crate::constants::UPDATER_TEMP_NAME;
        use crate::utils::platform::exe_name;

        let Ok(exe) = std::env::current_exe() else {
            return;
        };
        if exe.file_name().and_then(|n| n.to_str()) == Some(exe_name(UPDATER_TEMP_NAME).as_str()) {
            match std::fs::remove_file(&exe) {
                Ok(()) => debug!("Removed updater copy {}", exe.display()),
                Err(e) => debug!("Could not remove updater copy {}: {}", exe.display(), e),
            }
        }
    }
}
