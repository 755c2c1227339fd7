//! Streaming download of a release binary into its staging file.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::constants::{DOWNLOAD_CHUNK_SIZE, USER_AGENT};
use crate::core::UpdateError;
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::observer::UpdateObserver;
use crate::upgrade::session::UpdateSession;
use crate::upgrade::verification::ChecksumVerifier;
use crate::utils::platform::make_executable;

/// Downloads the binary named by an [`UpdateSession`] to `<executable>.new`.
///
/// The body is written in [`DOWNLOAD_CHUNK_SIZE`] slices. When the server
/// advertises a content length, [`UpdateObserver::on_progress`] fires after
/// each slice. Whatever goes wrong, the staging file is removed before the
/// error is returned, and the session is marked failed.
pub struct DownloadTask {
    client: reqwest::Client,
}

impl DownloadTask {
    pub fn new(config: &UpgradeConfig) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()?;

        Ok(Self { client })
    }

    /// Download and verify, leaving the session in `Downloaded`.
    ///
    /// `expected_sha256`, when given, is checked after the length check.
    /// Returns the staging path.
    pub async fn stage(
        &self,
        session: &mut UpdateSession,
        expected_sha256: Option<&str>,
        observer: &dyn UpdateObserver,
    ) -> Result<PathBuf, UpdateError> {
        let staging = session.new_executable_path().to_path_buf();

        match self.stage_inner(session, &staging, expected_sha256, observer).await {
            Ok(()) => {
                info!("Staged update at {}", staging.display());
                Ok(staging)
            }
            Err(e) => {
                session.fail();
                remove_staging(&staging).await;
                Err(e)
            }
        }
    }

    async fn stage_inner(
        &self,
        session: &mut UpdateSession,
        staging: &Path,
        expected_sha256: Option<&str>,
        observer: &dyn UpdateObserver,
    ) -> Result<(), UpdateError> {
        let url = session
            .download_url()
            .map(str::to_string)
            .ok_or_else(|| UpdateError::InvalidStateTransition {
                from: session.state().to_string(),
                to: "Downloading".to_string(),
            })?;

        debug!("Downloading {} to {}", url, staging.display());
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DownloadHttp {
                status: status.as_u16(),
            });
        }

        session.start_download(response.content_length())?;

        let mut file = File::create(staging).await?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for slice in chunk.chunks(DOWNLOAD_CHUNK_SIZE) {
                file.write_all(slice).await?;
                hasher.update(slice);
                session.add_downloaded(slice.len() as u64);

                if let Some(fraction) = session.fraction() {
                    observer.on_progress(fraction);
                }
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        session.finish_download()?;

        if let Some(expected) = expected_sha256 {
            ChecksumVerifier::ensure_matches(&hex::encode(hasher.finalize()), expected)?;
        }

        make_executable(staging)?;
        Ok(())
    }
}

async fn remove_staging(staging: &Path) {
    match tokio::fs::remove_file(staging).await {
        Ok(()) => debug!("Removed staging file {}", staging.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove staging file {}: {}", staging.display(), e),
    }
}
