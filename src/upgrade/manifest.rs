use chrono::Utc;
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::USER_AGENT;
use crate::core::UpdateError;
use crate::upgrade::config::UpgradeConfig;

/// Remote descriptor of the latest published release.
///
/// Fetched fresh on every check and never persisted.
///
/// ```json
/// { "latest_version": "2.1.0", "download_url": "https://example.com/vdpro-2.1.0" }
/// ```
///
/// An optional `sha256` field carries the hex digest of the binary; when it
/// is present the downloaded file is verified against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionManifest {
    /// Semantic version of the latest release.
    pub latest_version: String,
    /// Where the release binary can be downloaded.
    pub download_url: String,
    /// Optional hex-encoded SHA-256 of the release binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Wire shape of the manifest before the required fields are checked.
#[derive(Debug, Deserialize)]
struct RawManifest {
    latest_version: Option<String>,
    download_url: Option<String>,
    sha256: Option<String>,
}

impl TryFrom<RawManifest> for VersionManifest {
    type Error = UpdateError;

    fn try_from(raw: RawManifest) -> Result<Self, Self::Error> {
        let latest_version = raw.latest_version.filter(|v| !v.trim().is_empty()).ok_or_else(
            || UpdateError::ManifestInvalid {
                reason: "missing 'latest_version'".to_string(),
            },
        )?;
        let download_url = raw.download_url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
            UpdateError::ManifestInvalid {
                reason: "missing 'download_url'".to_string(),
            }
        })?;

        Ok(Self {
            latest_version,
            download_url,
            sha256: raw.sha256.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Outcome of a version check as seen by the caller.
///
/// `available == false` covers both "already up to date" and "the check
/// failed"; the two are only told apart in the logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCheck {
    /// Whether a newer version is published.
    pub available: bool,
    /// The published version, when available.
    pub latest_version: Option<String>,
    /// Download URL of the published version, when available.
    pub download_url: Option<String>,
    /// Expected digest of the download, when the manifest carries one.
    pub sha256: Option<String>,
}

impl UpdateCheck {
    /// The "nothing to do" result.
    pub fn not_available() -> Self {
        Self::default()
    }

    fn available(manifest: VersionManifest) -> Self {
        Self {
            available: true,
            latest_version: Some(manifest.latest_version),
            download_url: Some(manifest.download_url),
            sha256: manifest.sha256,
        }
    }
}

/// Retrieves the version manifest and compares it against the running version.
///
/// # Examples
///
/// ```rust,no_run
/// use vdpro::upgrade::ManifestFetcher;
/// use vdpro::upgrade::config::UpgradeConfig;
///
/// # async fn example() -> anyhow::Result<()> {
/// let fetcher = ManifestFetcher::new(&UpgradeConfig::default())?;
/// let check = fetcher.check_for_updates(env!("CARGO_PKG_VERSION")).await;
/// if check.available {
///     println!("Update available: {:?}", check.latest_version);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ManifestFetcher {
    client: reqwest::Client,
    manifest_url: String,
}

impl ManifestFetcher {
    /// Build a fetcher whose requests are bounded by `config.check_timeout()`.
    pub fn new(config: &UpgradeConfig) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.check_timeout())
            .build()?;

        Ok(Self {
            client,
            manifest_url: config.manifest_url.clone(),
        })
    }

    /// URL of the manifest this fetcher queries.
    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    /// Fetch and validate the manifest.
    ///
    /// This is the distinguishable error channel behind
    /// [`check_for_updates`](Self::check_for_updates): every failure comes back
    /// as a typed [`UpdateError`].
    pub async fn fetch_manifest(&self) -> Result<VersionManifest, UpdateError> {
        let timestamp = Utc::now().timestamp().to_string();
        debug!("Fetching version manifest from {}", self.manifest_url);

        let response = self
            .client
            .get(&self.manifest_url)
            .query(&[("t", timestamp.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::ManifestHttp {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let raw: RawManifest =
            serde_json::from_slice(&body).map_err(|e| UpdateError::ManifestInvalid {
                reason: e.to_string(),
            })?;

        raw.try_into()
    }

    /// Compare the published version against `current_version`.
    ///
    /// Never fails: any error while fetching, parsing or comparing is logged
    /// and reported as "not available".
    pub async fn check_for_updates(&self, current_version: &str) -> UpdateCheck {
        match self.try_check(current_version).await {
            Ok(check) => check,
            Err(e) => {
                warn!("Update check failed, reporting no update: {}", e);
                UpdateCheck::not_available()
            }
        }
    }

    async fn try_check(&self, current_version: &str) -> Result<UpdateCheck, UpdateError> {
        let manifest = self.fetch_manifest().await?;

        if is_newer(&manifest.latest_version, current_version)? {
            info!("Update available: {} -> {}", current_version, manifest.latest_version);
            Ok(UpdateCheck::available(manifest))
        } else {
            debug!(
                "Already on latest version {} (published: {})",
                current_version, manifest.latest_version
            );
            Ok(UpdateCheck::not_available())
        }
    }
}

/// Parse a version string, tolerating a `v` prefix and missing components.
///
/// `"v2"`, `"2.0"` and `"2.0.0"` all parse to `2.0.0`. Prerelease and build
/// suffixes are kept and ordered by semver rules.
pub fn parse_version(version: &str) -> Result<Version, UpdateError> {
    let invalid = || UpdateError::InvalidVersion {
        version: version.to_string(),
    };

    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);

    let components = core.split('.').count();
    let padded = match components {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => trimmed.to_string(),
    };

    Version::parse(&padded).map_err(|_| invalid())
}

/// Whether `latest` is strictly newer than `current` under semver ordering.
pub fn is_newer(latest: &str, current: &str) -> Result<bool, UpdateError> {
    Ok(parse_version(latest)? > parse_version(current)?)
}
