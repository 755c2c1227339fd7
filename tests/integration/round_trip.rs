//! Download, stage, hand off, install and relaunch against temp files.

#![cfg(unix)]

use anyhow::Result;
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;
use vdpro::constants::{UPDATER_BIN_NAME, UPDATER_TEMP_NAME};
use vdpro::test_utils::{CannedResponse, TestServer};
use vdpro::upgrade::config::UpgradeConfig;
use vdpro::upgrade::handoff::launch_updater;
use vdpro::upgrade::{ChannelObserver, InstallContext, SelfUpdater, UpdateEvent, UpdateLock};

use super::{app_path, write_executable};

#[tokio::test]
#[serial]
async fn test_update_round_trip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let install_dir = temp_dir.path().join("install");
    let run_dir = temp_dir.path().join("run");
    let settings_dir = temp_dir.path().join("settings");
    for dir in [&install_dir, &run_dir, &settings_dir] {
        std::fs::create_dir_all(dir)?;
    }

    let config_path = settings_dir.join("config.toml");
    std::fs::write(&config_path, "[upgrade]\nlock_wait_attempts = 20\nlock_wait_interval_ms = 50\n")?;

    let exe = app_path(&install_dir);
    write_executable(&exe, b"#!/bin/sh\nexit 0\n");
    std::fs::copy(
        assert_cmd::cargo::cargo_bin(UPDATER_BIN_NAME),
        install_dir.join(UPDATER_BIN_NAME),
    )?;

    let marker = temp_dir.path().join("relaunched");
    let new_binary = format!("#!/bin/sh\ntouch '{}'\n", marker.display());

    let server = TestServer::start().await?;
    server.route("/vdpro-2.1.0", CannedResponse::bytes(new_binary.clone().into_bytes()));
    server.route(
        "/version.json",
        CannedResponse::manifest("2.1.0", &server.url("/vdpro-2.1.0")),
    );

    let config = UpgradeConfig {
        manifest_url: server.url("/version.json"),
        ..UpgradeConfig::default()
    };
    let updater = SelfUpdater::new(config, InstallContext::new(exe.clone(), None, true))
        .with_current_version("2.0.0")
        .with_lock_dir(settings_dir.clone())
        .with_temp_dir(run_dir.clone())
        .with_config_path(Some(config_path.clone()));

    let (observer, mut rx) = ChannelObserver::new();
    let staged = updater.stage_latest(&observer).await?.expect("update available");

    assert_eq!(staged.updater(), run_dir.join(UPDATER_TEMP_NAME));
    assert_eq!(std::fs::read(staged.staged_path())?, new_binary.as_bytes());
    assert_eq!(staged.handoff().config_path.as_deref(), Some(config_path.as_path()));
    assert!(
        UpdateLock::try_acquire(&settings_dir).is_err(),
        "primary holds the update lock while staged"
    );
    assert!(matches!(rx.try_recv(), Ok(UpdateEvent::Progress(_))));

    // The primary would exit here; releasing the staged update stands in for that.
    let handoff = staged.handoff();
    let updater_copy = staged.updater().to_path_buf();
    let mut child = launch_updater(&updater_copy, &handoff)?;
    drop(staged);

    let status = tokio::task::spawn_blocking(move || child.wait()).await??;
    assert_eq!(status.code(), Some(0));

    assert_eq!(std::fs::read(&exe)?, new_binary.as_bytes());
    assert!(!handoff.new_executable_path.exists());

    for _ in 0..100 {
        if marker.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(marker.exists(), "updated application was relaunched");
    assert!(!updater_copy.exists(), "updater removed its temp copy");

    Ok(())
}
