//! One update attempt, from check to handoff.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::core::UpdateError;
use crate::upgrade::context::staging_path_for;

/// Set while an [`UpdateSession`] exists in this process.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Lifecycle of an update attempt in the primary process.
///
/// ```text
/// Idle → CheckingVersion → UpdateAvailable → Downloading → Downloaded → HandoffLaunched
///          ↘ Idle (no update)         any non-terminal state ↘ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing in flight.
    Idle,
    /// Manifest request running.
    CheckingVersion,
    /// A newer version is known and can be downloaded.
    UpdateAvailable,
    /// Staging file being written.
    Downloading,
    /// Staging file complete and verified.
    Downloaded,
    /// Updater launched; the process is about to exit.
    HandoffLaunched,
    /// The attempt failed; the staging file has been removed.
    Failed,
}

impl SessionState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::HandoffLaunched | Self::Failed)
    }

    fn can_transition_to(self, next: Self) -> bool {
        use SessionState::*;
        match (self, next) {
            (_, Failed) => !self.is_terminal(),
            (Idle, CheckingVersion) => true,
            (CheckingVersion, UpdateAvailable | Idle) => true,
            (UpdateAvailable, Downloading) => true,
            (Downloading, Downloaded) => true,
            (Downloaded, HandoffLaunched) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::CheckingVersion => "CheckingVersion",
            Self::UpdateAvailable => "UpdateAvailable",
            Self::Downloading => "Downloading",
            Self::Downloaded => "Downloaded",
            Self::HandoffLaunched => "HandoffLaunched",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Releases the process-wide session flag on drop.
#[derive(Debug)]
struct SessionGuard;

impl SessionGuard {
    fn acquire() -> Result<Self, UpdateError> {
        SESSION_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self)
            .map_err(|_| UpdateError::SessionActive)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        SESSION_ACTIVE.store(false, Ordering::Release);
    }
}

/// In-memory record of one update attempt.
///
/// Only one session can exist per process at a time; constructing a second
/// one while the first is alive fails with [`UpdateError::SessionActive`].
/// Dropping a session (after success or failure) frees the slot so the user
/// can retry.
#[derive(Debug)]
pub struct UpdateSession {
    current_version: String,
    target_version: Option<String>,
    download_url: Option<String>,
    old_executable_path: PathBuf,
    new_executable_path: PathBuf,
    bytes_downloaded: u64,
    bytes_total: Option<u64>,
    state: SessionState,
    _guard: SessionGuard,
}

impl UpdateSession {
    /// Start an idle session that will run its own version check.
    pub fn begin(
        current_version: impl Into<String>,
        old_executable_path: PathBuf,
    ) -> Result<Self, UpdateError> {
        let guard = SessionGuard::acquire()?;
        let new_executable_path = staging_path_for(&old_executable_path);

        Ok(Self {
            current_version: current_version.into(),
            target_version: None,
            download_url: None,
            old_executable_path,
            new_executable_path,
            bytes_downloaded: 0,
            bytes_total: None,
            state: SessionState::Idle,
            _guard: guard,
        })
    }

    /// Start a session for an update the caller already found.
    pub fn begin_with_update(
        current_version: impl Into<String>,
        target_version: Option<String>,
        download_url: impl Into<String>,
        old_executable_path: PathBuf,
    ) -> Result<Self, UpdateError> {
        let mut session = Self::begin(current_version, old_executable_path)?;
        session.target_version = target_version;
        session.download_url = Some(download_url.into());
        session.state = SessionState::UpdateAvailable;
        Ok(session)
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: SessionState) -> Result<(), UpdateError> {
        if !self.state.can_transition_to(next) {
            return Err(UpdateError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!("Update session: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Record the result of the version check (`CheckingVersion` → `UpdateAvailable` or `Idle`).
    pub fn record_check(
        &mut self,
        target_version: Option<String>,
        download_url: Option<String>,
    ) -> Result<(), UpdateError> {
        match download_url {
            Some(url) => {
                self.transition(SessionState::UpdateAvailable)?;
                self.target_version = target_version;
                self.download_url = Some(url);
            }
            None => self.transition(SessionState::Idle)?,
        }
        Ok(())
    }

    /// Enter `Downloading` with the advertised size, if any.
    pub fn start_download(&mut self, bytes_total: Option<u64>) -> Result<(), UpdateError> {
        self.transition(SessionState::Downloading)?;
        self.bytes_total = bytes_total;
        self.bytes_downloaded = 0;
        Ok(())
    }

    /// Account for `bytes` more written to the staging file.
    pub fn add_downloaded(&mut self, bytes: u64) {
        self.bytes_downloaded += bytes;
    }

    /// Enter `Downloaded`.
    ///
    /// Refuses with [`UpdateError::IncompleteDownload`] while the byte count
    /// differs from the advertised length.
    pub fn finish_download(&mut self) -> Result<(), UpdateError> {
        if let Some(expected) = self.bytes_total
            && expected != self.bytes_downloaded
        {
            return Err(UpdateError::IncompleteDownload {
                expected,
                actual: self.bytes_downloaded,
            });
        }
        self.transition(SessionState::Downloaded)
    }

    /// Mark the attempt as failed. No-op once terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            debug!("Update session: {} -> Failed", self.state);
            self.state = SessionState::Failed;
        }
    }

    /// Download progress in `0.0..=1.0`, when the size is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.bytes_total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_downloaded as f64 / total as f64).min(1.0)),
            None => None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn target_version(&self) -> Option<&str> {
        self.target_version.as_deref()
    }

    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    pub fn old_executable_path(&self) -> &Path {
        &self.old_executable_path
    }

    pub fn new_executable_path(&self) -> &Path {
        &self.new_executable_path
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded
    }

    pub fn bytes_total(&self) -> Option<u64> {
        self.bytes_total
    }
}
