//! Handing the install over to the updater process.
//!
//! The primary cannot overwrite its own executable while it runs (Windows
//! refuses outright, packaged builds may run from a mount that vanishes on
//! exit). So it locates the companion `vdpro-updater`, copies it somewhere
//! that survives its own exit, launches the copy detached with the two paths
//! and exits. A settings file chosen with `--config` reaches the updater
//! through `VDPRO_CONFIG` in its environment.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::process::Child;
use tracing::{debug, info};

use crate::config::CONFIG_PATH_ENV;
use crate::constants::{EXIT_OK, UPDATER_BIN_NAME, UPDATER_TEMP_NAME};
use crate::core::UpdateError;
use crate::upgrade::context::InstallContext;
use crate::upgrade::session::{SessionState, UpdateSession};
use crate::utils::platform::{exe_name, make_executable, spawn_detached_with_env};

/// What crosses the process boundary: two positional arguments, plus the
/// settings file when one was chosen explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterHandoff {
    pub old_executable_path: PathBuf,
    pub new_executable_path: PathBuf,
    /// Exported to the updater as `VDPRO_CONFIG`.
    pub config_path: Option<PathBuf>,
}

impl UpdaterHandoff {
    pub fn from_session(session: &UpdateSession) -> Self {
        Self {
            old_executable_path: session.old_executable_path().to_path_buf(),
            new_executable_path: session.new_executable_path().to_path_buf(),
            config_path: None,
        }
    }

    pub fn with_config_path(mut self, config_path: Option<PathBuf>) -> Self {
        self.config_path = config_path;
        self
    }

    /// Command-line arguments for the updater, in order.
    pub fn args(&self) -> [&Path; 2] {
        [&self.old_executable_path, &self.new_executable_path]
    }
}

/// Directories searched for the updater, in priority order.
///
/// The bundle root (and its `usr/bin`, the AppImage layout) comes before the
/// directory of the installed executable.
pub fn updater_search_dirs(context: &InstallContext) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(root) = context.bundle_root() {
        dirs.push(root.to_path_buf());
        dirs.push(root.join("usr").join("bin"));
    }
    if let Some(dir) = context.executable_dir() {
        dirs.push(dir.to_path_buf());
    }
    dirs
}

/// Find the updater binary. First match wins.
pub fn locate_updater(context: &InstallContext) -> Result<PathBuf, UpdateError> {
    let name = exe_name(UPDATER_BIN_NAME);
    let dirs = updater_search_dirs(context);

    for dir in &dirs {
        let candidate = dir.join(&name);
        if candidate.is_file() {
            debug!("Found updater at {}", candidate.display());
            return Ok(candidate);
        }
    }

    Err(UpdateError::UpdaterNotFound {
        searched: dirs.iter().map(|d| d.display().to_string()).collect::<Vec<_>>().join(", "),
    })
}

/// Copy the updater to `<temp_dir>/vdpro-updater-run[.exe]` and make it executable.
pub fn prepare_updater(updater: &Path, temp_dir: &Path) -> Result<PathBuf, UpdateError> {
    let target = temp_dir.join(exe_name(UPDATER_TEMP_NAME));
    if target != updater {
        std::fs::copy(updater, &target)?;
    }
    make_executable(&target)?;
    debug!("Prepared updater copy at {}", target.display());
    Ok(target)
}

/// Start the prepared updater detached with the handoff arguments.
pub fn launch_updater(updater: &Path, handoff: &UpdaterHandoff) -> Result<Child, UpdateError> {
    info!(
        "Launching updater: {} {} {}",
        updater.display(),
        handoff.old_executable_path.display(),
        handoff.new_executable_path.display()
    );
    let envs = handoff.config_path.as_deref().map(|path| (CONFIG_PATH_ENV, path));
    Ok(spawn_detached_with_env(updater, handoff.args(), envs)?)
}

/// Launch the updater for a `Downloaded` session and terminate this process.
///
/// Only returns on failure; on success the process exits with code 0 so the
/// old executable is released for the updater.
pub fn handoff_and_exit(
    session: &mut UpdateSession,
    prepared_updater: &Path,
    config_path: Option<&Path>,
) -> Result<Infallible, UpdateError> {
    if session.state() != SessionState::Downloaded {
        return Err(UpdateError::InvalidStateTransition {
            from: session.state().to_string(),
            to: SessionState::HandoffLaunched.to_string(),
        });
    }

    let handoff = UpdaterHandoff::from_session(session)
        .with_config_path(config_path.map(Path::to_path_buf));
    launch_updater(prepared_updater, &handoff)?;
    session.transition(SessionState::HandoffLaunched)?;

    info!("Updater launched, exiting");
    std::process::exit(EXIT_OK)
}
