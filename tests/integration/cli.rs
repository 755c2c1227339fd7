//! `vdpro` commands as a black box.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vdpro::test_utils::{CannedResponse, TestServer};

fn write_config(temp_dir: &TempDir, manifest_url: &str) -> PathBuf {
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!("[upgrade]\nmanifest_url = \"{manifest_url}\"\ncheck_timeout_secs = 2\n"),
    )
    .unwrap();
    path
}

fn vdpro(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vdpro").unwrap();
    cmd.env("VDPRO_CONFIG", config).env("VDPRO_NO_PROGRESS", "1").env_remove("RUST_LOG");
    cmd
}

/// Run a blocking command while the test server keeps serving.
async fn run(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert()).await.unwrap()
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("vdpro")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_path_and_set() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("nested").join("config.toml");

    vdpro(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(config.display().to_string()));

    vdpro(&config).args(["config", "set", "upgrade.check_on_startup", "false"]).assert().success();
    assert!(config.exists());

    vdpro(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("check_on_startup = false"));

    vdpro(&config)
        .args(["config", "set", "upgrade.unknown", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_check_with_unreachable_manifest_reads_up_to_date() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "http://127.0.0.1:9/version.json");

    vdpro(&config)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("latest version"));
}

#[tokio::test]
async fn test_check_reports_available_update() {
    let server = TestServer::start().await.unwrap();
    server.route("/version.json", CannedResponse::manifest("99.0.0", "http://x/bin"));
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.url("/version.json"));

    let mut cmd = vdpro(&config);
    cmd.arg("check");
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Update available"))
        .stdout(predicate::str::contains("99.0.0"));
}

#[tokio::test]
async fn test_startup_check_prints_notice() {
    let server = TestServer::start().await.unwrap();
    server.route("/version.json", CannedResponse::manifest("99.0.0", "http://x/bin"));
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.url("/version.json"));

    run(vdpro(&config))
        .await
        .success()
        .stdout(predicate::str::contains("VideoDownloaderPro"))
        .stdout(predicate::str::contains("vdpro upgrade"));
}

#[tokio::test]
async fn test_upgrade_refused_for_development_build() {
    let server = TestServer::start().await.unwrap();
    server.route("/version.json", CannedResponse::manifest("99.0.0", "http://x/bin"));
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.url("/version.json"));

    let mut cmd = vdpro(&config);
    cmd.args(["upgrade", "--yes"]);
    run(cmd).await.code(1).stderr(predicate::str::contains("packaged build"));

    // No binary request was made.
    assert!(server.requests().iter().all(|r| r.starts_with("/version.json")));
}

#[test]
fn test_upgrade_up_to_date() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "http://127.0.0.1:9/version.json");

    vdpro(&config)
        .args(["upgrade", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already on the latest version"));
}
