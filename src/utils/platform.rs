//! Platform-specific helpers for the update handoff
//!
//! Launching a process that must outlive its parent, marking files executable
//! and naming executables differ between Windows and Unix. This module keeps
//! those differences out of the update core.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vdpro::utils::platform::{exe_name, spawn_detached};
//! use std::path::Path;
//!
//! # fn example() -> std::io::Result<()> {
//! let updater = Path::new("/tmp").join(exe_name("vdpro-updater-run"));
//! spawn_detached(&updater, ["/opt/vdpro/vdpro", "/opt/vdpro/vdpro.new"])?;
//! # Ok(())
//! # }
//! ```

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::debug;

/// Windows process creation flags for a launch that survives the parent:
/// `DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP | CREATE_BREAKAWAY_FROM_JOB`.
#[cfg(windows)]
const DETACHED_CREATION_FLAGS: u32 = 0x0000_0008 | 0x0000_0200 | 0x0100_0000;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// File name of an executable with the given stem on this platform.
///
/// `vdpro-updater` on Unix, `vdpro-updater.exe` on Windows.
#[must_use]
pub fn exe_name(stem: &str) -> String {
    format!("{stem}{}", std::env::consts::EXE_SUFFIX)
}

/// Give `path` `rwxr-xr-x` permissions. No-op on Windows.
pub fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Start `program` so that it keeps running after this process exits.
///
/// Standard streams are redirected to null. On Unix the child gets its own
/// process group, so signals aimed at the parent's group do not reach it. On
/// Windows it is detached from the console and broken away from any job
/// object the parent belongs to.
pub fn spawn_detached<I, S>(program: &Path, args: I) -> io::Result<Child>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    spawn_detached_with_env(program, args, std::iter::empty::<(&str, &OsStr)>())
}

/// [`spawn_detached`] with extra environment variables set on the child.
pub fn spawn_detached_with_env<I, S, E, K, V>(program: &Path, args: I, envs: E) -> io::Result<Child>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .envs(envs)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(DETACHED_CREATION_FLAGS);
    }

    let child = command.spawn()?;
    debug!("Spawned detached process {} (pid {})", program.display(), child.id());
    Ok(child)
}
