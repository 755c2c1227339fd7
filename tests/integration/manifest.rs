//! Version check against a served manifest.

use anyhow::Result;
use vdpro::core::UpdateError;
use vdpro::test_utils::{CannedResponse, TestServer};
use vdpro::upgrade::config::UpgradeConfig;
use vdpro::upgrade::{ManifestFetcher, UpdateCheck};

async fn fetcher_for(server: &TestServer) -> Result<ManifestFetcher> {
    let config = UpgradeConfig {
        manifest_url: server.url("/version.json"),
        check_timeout_secs: 2,
        ..UpgradeConfig::default()
    };
    Ok(ManifestFetcher::new(&config)?)
}

#[tokio::test]
async fn test_newer_version_is_available() -> Result<()> {
    let server = TestServer::start().await?;
    server.route(
        "/version.json",
        CannedResponse::manifest("2.0.10", "http://example.invalid/vdpro-2.0.10"),
    );
    let fetcher = fetcher_for(&server).await?;

    let check = fetcher.check_for_updates("2.0.9").await;
    assert!(check.available, "2.0.10 is newer than 2.0.9");
    assert_eq!(check.latest_version.as_deref(), Some("2.0.10"));
    assert_eq!(check.download_url.as_deref(), Some("http://example.invalid/vdpro-2.0.10"));

    let check = fetcher.check_for_updates("2.0.10").await;
    assert_eq!(check, UpdateCheck::not_available());

    let check = fetcher.check_for_updates("3.0.0").await;
    assert_eq!(check, UpdateCheck::not_available());
    Ok(())
}

#[tokio::test]
async fn test_request_carries_cache_buster() -> Result<()> {
    let server = TestServer::start().await?;
    server.route("/version.json", CannedResponse::manifest("1.0.0", "http://x/bin"));
    let fetcher = fetcher_for(&server).await?;

    fetcher.check_for_updates("1.0.0").await;

    let requests = server.requests();
    assert_eq!(requests.len(), 1, "exactly one manifest request per check");
    let query = requests[0].split_once('?').map(|(_, q)| q).unwrap_or_default();
    let timestamp = query.strip_prefix("t=").expect("t= query parameter");
    assert!(timestamp.parse::<i64>().is_ok(), "timestamp is numeric: {timestamp}");
    Ok(())
}

#[tokio::test]
async fn test_checksum_is_forwarded() -> Result<()> {
    let server = TestServer::start().await?;
    server.route(
        "/version.json",
        CannedResponse::json(
            r#"{"latest_version": "9.0.0", "download_url": "http://x/bin", "sha256": "abcd"}"#,
        ),
    );
    let fetcher = fetcher_for(&server).await?;

    let check = fetcher.check_for_updates("1.0.0").await;
    assert!(check.available);
    assert_eq!(check.sha256.as_deref(), Some("abcd"));
    Ok(())
}

#[tokio::test]
async fn test_failures_read_as_not_available() -> Result<()> {
    let cases = [
        ("server error", CannedResponse::Status(500)),
        ("malformed json", CannedResponse::json("{\"latest_version\": ")),
        ("missing download_url", CannedResponse::json(r#"{"latest_version": "9.0.0"}"#)),
        ("missing latest_version", CannedResponse::json(r#"{"download_url": "http://x/bin"}"#)),
        (
            "unparseable version",
            CannedResponse::json(r#"{"latest_version": "newest", "download_url": "http://x"}"#),
        ),
        ("not json at all", CannedResponse::bytes(b"<html>oops</html>".to_vec())),
    ];

    for (name, response) in cases {
        let server = TestServer::start().await?;
        server.route("/version.json", response);
        let fetcher = fetcher_for(&server).await?;

        let check = fetcher.check_for_updates("1.0.0").await;
        assert_eq!(check, UpdateCheck::not_available(), "case: {name}");
    }
    Ok(())
}

#[tokio::test]
async fn test_fetch_manifest_distinguishes_failures() -> Result<()> {
    let server = TestServer::start().await?;
    server.route("/version.json", CannedResponse::Status(503));
    let fetcher = fetcher_for(&server).await?;
    assert!(matches!(
        fetcher.fetch_manifest().await,
        Err(UpdateError::ManifestHttp { status: 503 })
    ));

    server.route("/version.json", CannedResponse::json("[]"));
    assert!(matches!(
        fetcher.fetch_manifest().await,
        Err(UpdateError::ManifestInvalid { .. })
    ));

    server.route("/version.json", CannedResponse::manifest("2.0.0", "http://x/bin"));
    let manifest = fetcher.fetch_manifest().await?;
    assert_eq!(manifest.latest_version, "2.0.0");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_host_is_not_available() -> Result<()> {
    let config = UpgradeConfig {
        manifest_url: "http://127.0.0.1:9/version.json".to_string(),
        check_timeout_secs: 1,
        ..UpgradeConfig::default()
    };
    let fetcher = ManifestFetcher::new(&config)?;

    assert_eq!(fetcher.check_for_updates("1.0.0").await, UpdateCheck::not_available());
    assert!(matches!(fetcher.fetch_manifest().await, Err(UpdateError::Http(_))));
    Ok(())
}
