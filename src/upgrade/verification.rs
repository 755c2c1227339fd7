use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::core::UpdateError;

/// Verifies staged binaries against the SHA-256 digest published in the manifest.
///
/// Digests are compared case-insensitively, with or without a `sha256:` prefix.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the hex-encoded SHA-256 of a file.
    ///
    /// ```rust,no_run
    /// use vdpro::upgrade::verification::ChecksumVerifier;
    /// use std::path::Path;
    ///
    /// # async fn example() -> Result<(), vdpro::core::UpdateError> {
    /// let digest = ChecksumVerifier::compute_sha256(Path::new("/opt/vdpro/vdpro.new")).await?;
    /// println!("SHA256: {digest}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compute_sha256(file_path: &Path) -> Result<String, UpdateError> {
        debug!("Computing SHA256 checksum for: {:?}", file_path);

        let contents = fs::read(file_path).await?;
        let mut hasher = Sha256::new();
        hasher.update(&contents);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Verify a file against an expected digest.
    pub async fn verify_checksum(file_path: &Path, expected: &str) -> Result<(), UpdateError> {
        info!("Verifying checksum for: {:?}", file_path);
        let actual = Self::compute_sha256(file_path).await?;
        Self::ensure_matches(&actual, expected)
    }

    /// Compare an already computed digest with the expected one.
    pub fn ensure_matches(actual: &str, expected: &str) -> Result<(), UpdateError> {
        let actual = normalize(actual);
        let expected = normalize(expected);

        if actual != expected {
            return Err(UpdateError::ChecksumMismatch { expected, actual });
        }

        info!("Checksum verification successful");
        Ok(())
    }
}

fn normalize(digest: &str) -> String {
    let digest = digest.trim();
    let digest = digest
        .strip_prefix("sha256:")
        .or_else(|| digest.strip_prefix("SHA256:"))
        .unwrap_or(digest);
    digest.to_ascii_lowercase()
}
