//! Cross-process update lock.
//!
//! The in-process session guard only protects one process. If the updater
//! crashes mid-install, nothing stops the user from relaunching the old
//! primary and starting a second update. `UpdateLock` closes that gap with an
//! advisory lock file (`update.lock`) in the settings directory:
//!
//! - the primary takes it without waiting when a download starts and holds it
//!   until the process exits (the handoff exits without unlocking; the OS
//!   releases it),
//! - the updater waits for it and holds it while it swaps files.
//!
//! The lock file itself is left in place; only the lock on it matters.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::UPDATE_LOCK_FILE;
use crate::core::UpdateError;

/// Held exclusive lock on `<settings dir>/update.lock`.
#[derive(Debug)]
pub struct UpdateLock {
    file: File,
    path: PathBuf,
}

impl UpdateLock {
    /// Take the lock without waiting.
    ///
    /// Fails with [`UpdateError::UpdateInProgress`] if another holder exists.
    pub fn try_acquire(dir: &Path) -> Result<Self, UpdateError> {
        let (file, path) = open_lock_file(dir)?;

        match file.try_lock_exclusive() {
            Ok(true) => {
                debug!("Acquired update lock at {}", path.display());
                Ok(Self { file, path })
            }
            Ok(false) => Err(UpdateError::UpdateInProgress {
                path: path.display().to_string(),
            }),
            Err(e) => Err(UpdateError::Io(e)),
        }
    }

    /// Take the lock, retrying every `interval` up to `attempts` times.
    ///
    /// Used by the updater, which starts while the primary still holds it.
    pub async fn acquire_with_retry(
        dir: &Path,
        attempts: u32,
        interval: Duration,
    ) -> Result<Self, UpdateError> {
        let mut last_error = None;

        for attempt in 1..=attempts.max(1) {
            match Self::try_acquire(dir) {
                Ok(lock) => return Ok(lock),
                Err(e) => {
                    debug!("Update lock attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(last_error.unwrap_or_else(|| UpdateError::UpdateInProgress {
            path: dir.join(UPDATE_LOCK_FILE).display().to_string(),
        }))
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UpdateLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

fn open_lock_file(dir: &Path) -> Result<(File, PathBuf), UpdateError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(UPDATE_LOCK_FILE);
    let file = OpenOptions::new().create(true).write(true).truncate(false).open(&path)?;
    Ok((file, path))
}
