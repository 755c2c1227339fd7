//! Where the running application lives and how it was packaged.

use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::constants::STAGING_SUFFIX;
use crate::core::UpdateError;

/// Location facts about the running application, captured once.
///
/// Built with [`InstallContext::detect`] in the binary, or with
/// [`InstallContext::new`] when the paths are known (tests, embedding).
///
/// - `executable` is the file the user installed and that gets replaced.
///   For an AppImage this is `$APPIMAGE`, not the binary inside the mount.
/// - `bundle_root` is the packaging temp-extraction root, if any (`$APPDIR`
///   for an AppImage). Files under it disappear when the process exits.
/// - `packaged` is false for development builds run out of a cargo target
///   directory; those cannot update themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallContext {
    executable: PathBuf,
    bundle_root: Option<PathBuf>,
    packaged: bool,
}

impl InstallContext {
    /// Create a context from explicit paths.
    pub fn new(executable: PathBuf, bundle_root: Option<PathBuf>, packaged: bool) -> Self {
        Self {
            executable,
            bundle_root,
            packaged,
        }
    }

    /// Inspect the current process.
    pub fn detect() -> Result<Self, UpdateError> {
        let appimage = non_empty_var("APPIMAGE").map(PathBuf::from);
        let bundle_root = non_empty_var("APPDIR").map(PathBuf::from);

        let (executable, packaged) = match appimage {
            Some(path) => (path, true),
            None => {
                let exe = env::current_exe()?;
                let packaged = !is_cargo_build_path(&exe);
                (exe, packaged)
            }
        };

        Ok(Self {
            executable,
            bundle_root,
            packaged,
        })
    }

    /// The installed executable that an update replaces.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Directory containing the installed executable.
    pub fn executable_dir(&self) -> Option<&Path> {
        self.executable.parent()
    }

    /// Packaging temp-extraction root, if running from one.
    pub fn bundle_root(&self) -> Option<&Path> {
        self.bundle_root.as_deref()
    }

    /// Whether this is a packaged build.
    pub fn is_packaged(&self) -> bool {
        self.packaged
    }

    /// Fail with [`UpdateError::NotPackaged`] for development builds.
    pub fn ensure_packaged(&self) -> Result<(), UpdateError> {
        if self.packaged {
            Ok(())
        } else {
            Err(UpdateError::NotPackaged {
                path: self.executable.display().to_string(),
            })
        }
    }

    /// Staging path for the new binary: `<executable>.new`.
    pub fn staging_path(&self) -> PathBuf {
        staging_path_for(&self.executable)
    }
}

/// Append [`STAGING_SUFFIX`] to the full file name, keeping the directory.
///
/// `/opt/vdpro/vdpro` → `/opt/vdpro/vdpro.new`, `C:\vdpro\vdpro.exe` →
/// `C:\vdpro\vdpro.exe.new`. Same directory, so the final move never crosses
/// a device boundary.
pub fn staging_path_for(executable: &Path) -> PathBuf {
    let mut name: OsString = executable.file_name().map(OsString::from).unwrap_or_default();
    name.push(STAGING_SUFFIX);
    executable.with_file_name(name)
}

fn non_empty_var(key: &str) -> Option<OsString> {
    env::var_os(key).filter(|v| !v.is_empty())
}

/// True when the path sits in a cargo `target/<profile>` or
/// `target/<triple>/<profile>` directory.
fn is_cargo_build_path(path: &Path) -> bool {
    let names: Vec<&std::ffi::OsStr> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();

    names.iter().enumerate().any(|(i, name)| {
        *name == "target"
            && names[i + 1..]
                .iter()
                .take(2)
                .any(|next| *next == "debug" || *next == "release")
    })
}
