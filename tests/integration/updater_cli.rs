//! `vdpro-updater` as a black box: arguments and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;
use vdpro::upgrade::UpdateLock;

/// Temp dir with a fast-retry config; returns the config path.
fn settings(temp_dir: &TempDir) -> PathBuf {
    let config = temp_dir.path().join("settings").join("config.toml");
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(&config, "[upgrade]\nlock_wait_attempts = 2\nlock_wait_interval_ms = 10\n")
        .unwrap();
    config
}

fn updater(config: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("vdpro-updater").unwrap();
    cmd.env("VDPRO_CONFIG", config).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_wrong_argument_count_is_usage_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = settings(&temp_dir);

    updater(&config).assert().code(2).stderr(predicate::str::contains("Usage"));
    updater(&config).arg("only-one").assert().code(2);
    updater(&config).args(["a", "b", "c"]).assert().code(2);
    for flag in ["--help", "-h", "--version", "-V"] {
        updater(&config).arg(flag).assert().code(2);
    }
}

#[test]
fn test_installs_and_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    let config = settings(&temp_dir);
    let old = temp_dir.path().join("vdpro");
    let new = temp_dir.path().join("vdpro.new");
    std::fs::write(&old, b"version 1").unwrap();
    std::fs::write(&new, b"version 2").unwrap();

    updater(&config)
        .arg(&old)
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::contains("Update complete"));

    assert_eq!(std::fs::read(&old).unwrap(), b"version 2");
    assert!(!new.exists());
}

#[test]
fn test_missing_staged_file_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let config = settings(&temp_dir);
    let old = temp_dir.path().join("vdpro");
    std::fs::write(&old, b"version 1").unwrap();

    updater(&config)
        .arg(&old)
        .arg(temp_dir.path().join("vdpro.new"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Update failed"));

    assert_eq!(std::fs::read(&old).unwrap(), b"version 1");
}

#[test]
fn test_held_update_lock_times_out() {
    let temp_dir = TempDir::new().unwrap();
    let config = settings(&temp_dir);
    let old = temp_dir.path().join("vdpro");
    let new = temp_dir.path().join("vdpro.new");
    std::fs::write(&old, b"version 1").unwrap();
    std::fs::write(&new, b"version 2").unwrap();

    let _held = UpdateLock::try_acquire(config.parent().unwrap()).unwrap();

    updater(&config)
        .arg(&old)
        .arg(&new)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Timed out"));

    assert_eq!(std::fs::read(&old).unwrap(), b"version 1");
    assert!(new.exists());
}
