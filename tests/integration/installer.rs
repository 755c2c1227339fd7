//! The updater's wait-install-relaunch sequence on real files.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use vdpro::upgrade::{InstallFs, Installer, InstallerState, StatusDisplay, StdFs};

/// Deletes of `held` fail until `released` is set, like a running executable on Windows.
struct HeldFile {
    released: Arc<AtomicBool>,
}

impl InstallFs for HeldFile {
    fn exists(&self, path: &Path) -> bool {
        StdFs.exists(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if !self.released.load(Ordering::SeqCst) && path.extension().is_none() {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "file in use"));
        }
        StdFs.remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        StdFs.rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        StdFs.copy(from, to)
    }
}

struct Quiet;

impl StatusDisplay for Quiet {
    fn show(&self, _state: InstallerState, _detail: Option<&str>) {}
}

fn setup() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let old = temp_dir.path().join("vdpro");
    let new = temp_dir.path().join("vdpro.new");
    std::fs::write(&old, b"version 1").unwrap();
    std::fs::write(&new, b"version 2").unwrap();
    (temp_dir, old, new)
}

#[tokio::test]
async fn test_installs_once_primary_exits_within_budget() {
    let (_temp_dir, old, new) = setup();
    let released = Arc::new(AtomicBool::new(false));

    let release = {
        let released = Arc::clone(&released);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            released.store(true, Ordering::SeqCst);
        })
    };

    let installer = Installer::new(old.clone(), new.clone())
        .with_retry(50, Duration::from_millis(10))
        .relaunch(false)
        .with_fs(HeldFile {
            released: Arc::clone(&released),
        });

    let state = installer.run(&Quiet).await;
    release.await.unwrap();

    assert_eq!(state, InstallerState::Done);
    assert_eq!(state.exit_code(), 0);
    assert_eq!(std::fs::read(&old).unwrap(), b"version 2");
    assert!(!new.exists());
}

#[tokio::test]
async fn test_times_out_without_touching_files() {
    let (_temp_dir, old, new) = setup();

    let installer = Installer::new(old.clone(), new.clone())
        .with_retry(4, Duration::from_millis(5))
        .relaunch(false)
        .with_fs(HeldFile {
            released: Arc::new(AtomicBool::new(false)),
        });

    let state = installer.run(&Quiet).await;

    assert_eq!(state, InstallerState::TimedOut);
    assert_eq!(state.exit_code(), 1);
    assert_eq!(std::fs::read(&old).unwrap(), b"version 1");
    assert_eq!(std::fs::read(&new).unwrap(), b"version 2");
}

#[cfg(unix)]
#[tokio::test]
async fn test_relaunches_installed_executable() {
    let temp_dir = TempDir::new().unwrap();
    let old = temp_dir.path().join("vdpro");
    let new = temp_dir.path().join("vdpro.new");
    let marker = temp_dir.path().join("relaunched");

    std::fs::write(&old, b"#!/bin/sh\nexit 0\n").unwrap();
    std::fs::write(&new, format!("#!/bin/sh\ntouch '{}'\n", marker.display())).unwrap();

    let state = Installer::new(old.clone(), new)
        .with_retry(1, Duration::ZERO)
        .run(&Quiet)
        .await;
    assert_eq!(state, InstallerState::Done);

    for _ in 0..100 {
        if marker.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(marker.exists(), "installed executable was started");
}

#[tokio::test]
async fn test_relaunch_failure_still_done() {
    let (_temp_dir, old, new) = setup();

    // "version 2" is not a runnable program.
    let state = Installer::new(old, new).with_retry(1, Duration::ZERO).run(&Quiet).await;
    assert_eq!(state, InstallerState::Done);
}
