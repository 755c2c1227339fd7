//! Download and staging of a release binary.

use anyhow::Result;
use serial_test::serial;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use vdpro::constants::UPDATER_BIN_NAME;
use vdpro::core::UpdateError;
use vdpro::test_utils::{CannedResponse, TestServer};
use vdpro::upgrade::config::UpgradeConfig;
use vdpro::upgrade::{
    ChannelObserver, DownloadTask, InstallContext, SelfUpdater, SessionState, UpdateCheck,
    UpdateEvent, UpdateSession,
};
use vdpro::utils::exe_name;

use super::app_path;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<UpdateEvent>) -> Vec<UpdateEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn progress_values(events: &[UpdateEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            UpdateEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

#[tokio::test]
#[serial]
async fn test_stage_reports_monotonic_progress() -> Result<()> {
    vdpro::test_utils::init_test_logging(None);
    let body = payload(200_000);
    let server = TestServer::start().await?;
    server.route("/vdpro-2.1.0", CannedResponse::bytes(body.clone()));

    let temp_dir = TempDir::new()?;
    let exe = app_path(temp_dir.path());
    let mut session = UpdateSession::begin_with_update(
        "2.0.0",
        Some("2.1.0".to_string()),
        server.url("/vdpro-2.1.0"),
        exe.clone(),
    )?;
    let (observer, mut rx) = ChannelObserver::new();

    let task = DownloadTask::new(&UpgradeConfig::default())?;
    let staged = task.stage(&mut session, None, &observer).await?;

    assert_eq!(staged, session.new_executable_path());
    assert_eq!(std::fs::read(&staged)?, body);
    assert_eq!(session.state(), SessionState::Downloaded);
    assert_eq!(session.bytes_downloaded(), 200_000);

    let progress = progress_values(&drain(&mut rx));
    assert!(progress.len() >= 200_000 / (8 * 1024), "one callback per 8 KiB slice");
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "progress never decreases");
    assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(progress.last().copied(), Some(1.0));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&staged)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_unknown_length_has_no_progress() -> Result<()> {
    let body = payload(20_000);
    let server = TestServer::start().await?;
    server.route("/bin", CannedResponse::Unsized(body.clone()));

    let temp_dir = TempDir::new()?;
    let mut session = UpdateSession::begin_with_update(
        "2.0.0",
        None,
        server.url("/bin"),
        app_path(temp_dir.path()),
    )?;
    let (observer, mut rx) = ChannelObserver::new();

    let staged = DownloadTask::new(&UpgradeConfig::default())?
        .stage(&mut session, None, &observer)
        .await?;

    assert_eq!(std::fs::read(staged)?, body);
    assert!(drain(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_http_error_leaves_nothing_behind() -> Result<()> {
    let server = TestServer::start().await?;
    server.route("/bin", CannedResponse::Status(404));

    let temp_dir = TempDir::new()?;
    let mut session = UpdateSession::begin_with_update(
        "2.0.0",
        None,
        server.url("/bin"),
        app_path(temp_dir.path()),
    )?;
    let staging = session.new_executable_path().to_path_buf();
    let (observer, _rx) = ChannelObserver::new();

    let result = DownloadTask::new(&UpgradeConfig::default())?
        .stage(&mut session, None, &observer)
        .await;

    assert!(matches!(result, Err(UpdateError::DownloadHttp { status: 404 })));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(!staging.exists());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_checksum_verification() -> Result<()> {
    let body = payload(10_000);
    let digest = hex::encode(Sha256::digest(&body));
    let server = TestServer::start().await?;
    server.route("/bin", CannedResponse::bytes(body));
    let task = DownloadTask::new(&UpgradeConfig::default())?;
    let temp_dir = TempDir::new()?;
    let (observer, _rx) = ChannelObserver::new();

    {
        let mut session = UpdateSession::begin_with_update(
            "2.0.0",
            None,
            server.url("/bin"),
            app_path(temp_dir.path()),
        )?;
        let staged = task.stage(&mut session, Some(&digest.to_uppercase()), &observer).await?;
        assert!(staged.exists());
    }

    let mut session = UpdateSession::begin_with_update(
        "2.0.0",
        None,
        server.url("/bin"),
        app_path(temp_dir.path()),
    )?;
    let wrong = "0".repeat(64);
    let result = task.stage(&mut session, Some(&wrong), &observer).await;
    assert!(matches!(result, Err(UpdateError::ChecksumMismatch { .. })));
    assert!(!session.new_executable_path().exists());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_truncated_download_never_completes() -> Result<()> {
    let server = TestServer::start().await?;
    server.route(
        "/bin",
        CannedResponse::Truncated {
            advertised: 100_000,
            body: payload(40_000),
        },
    );

    let temp_dir = TempDir::new()?;
    let install_dir = temp_dir.path().join("install");
    std::fs::create_dir_all(&install_dir)?;
    std::fs::write(install_dir.join(exe_name(UPDATER_BIN_NAME)), b"updater")?;
    let exe = app_path(&install_dir);
    std::fs::write(&exe, b"old")?;

    let updater = SelfUpdater::new(
        UpgradeConfig::default(),
        InstallContext::new(exe.clone(), None, true),
    )
    .with_temp_dir(temp_dir.path().to_path_buf());
    let check = UpdateCheck {
        available: true,
        latest_version: Some("2.1.0".to_string()),
        download_url: Some(server.url("/bin")),
        sha256: None,
    };
    let (observer, mut rx) = ChannelObserver::new();

    let result = updater.install(&check, &observer).await;
    assert!(result.is_err());

    let events = drain(&mut rx);
    assert!(!events.contains(&UpdateEvent::Complete));
    assert!(matches!(events.last(), Some(UpdateEvent::Error(_))));
    assert!(progress_values(&events).iter().all(|p| *p < 1.0));
    assert!(!install_dir.join(format!("{}.new", exe_name("vdpro"))).exists());
    assert_eq!(std::fs::read(&exe)?, b"old");

    // The session ended, so a new attempt can start.
    assert!(UpdateSession::begin("2.0.0", exe).is_ok());
    Ok(())
}
