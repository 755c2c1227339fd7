use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::UpdateError;
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::context::InstallContext;
use crate::upgrade::download::DownloadTask;
use crate::upgrade::handoff::{UpdaterHandoff, handoff_and_exit, locate_updater, prepare_updater};
use crate::upgrade::lock::UpdateLock;
use crate::upgrade::manifest::{ManifestFetcher, UpdateCheck};
use crate::upgrade::observer::UpdateObserver;
use crate::upgrade::session::{SessionState, UpdateSession};

/// Drives an update from version check to updater handoff.
///
/// `SelfUpdater` ties the pieces of the update core together for the primary
/// process: it checks the manifest, downloads the new binary next to the
/// installed one, copies the updater to the temp directory and launches it.
///
/// # Flow
///
/// 1. Refuse development builds ([`UpdateError::NotPackaged`]) and fail early if
///    the updater binary is missing, before any network traffic.
/// 2. Take the cross-process update lock (when a lock directory is set).
/// 3. Open the [`UpdateSession`] and stream the binary to `<exe>.new`.
/// 4. Copy the updater to the temp directory.
/// 5. Report [`UpdateObserver::on_complete`], launch the updater detached and
///    exit the process.
///
/// Any failure before the launch is reported once through
/// [`UpdateObserver::on_error`], the staging file is removed and the session
/// ends, so the update can be retried.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use vdpro::upgrade::{InstallContext, NoopObserver, SelfUpdater};
/// use vdpro::upgrade::config::UpgradeConfig;
///
/// # async fn example() -> anyhow::Result<()> {
/// let updater = SelfUpdater::new(UpgradeConfig::default(), InstallContext::detect()?);
/// let check = updater.check_for_updates().await;
/// if check.available {
///     // Only returns on failure; on success the process has exited.
///     updater.install(&check, &NoopObserver).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater {
    config: UpgradeConfig,
    context: InstallContext,
    current_version: String,
    lock_dir: Option<PathBuf>,
    temp_dir: PathBuf,
    config_path: Option<PathBuf>,
}

/// A verified binary in the staging location, ready for handoff.
///
/// Holds the session (state `Downloaded`) and the update lock until it is
/// handed off or dropped.
#[derive(Debug)]
pub struct StagedUpdate {
    session: UpdateSession,
    updater: PathBuf,
    config_path: Option<PathBuf>,
    _lock: Option<UpdateLock>,
}

impl StagedUpdate {
    /// Path of the staged binary.
    pub fn staged_path(&self) -> &Path {
        self.session.new_executable_path()
    }

    /// Path of the prepared updater copy.
    pub fn updater(&self) -> &Path {
        &self.updater
    }

    pub fn session(&self) -> &UpdateSession {
        &self.session
    }

    /// Arguments the updater will be started with.
    pub fn handoff(&self) -> UpdaterHandoff {
        UpdaterHandoff::from_session(&self.session).with_config_path(self.config_path.clone())
    }

    /// Launch the updater and exit. Only returns on failure, after removing
    /// the staged binary.
    pub fn launch_and_exit(mut self) -> Result<Infallible, UpdateError> {
        match handoff_and_exit(&mut self.session, &self.updater, self.config_path.as_deref()) {
            Ok(never) => match never {},
            Err(e) => {
                self.session.fail();
                if let Err(remove_err) = std::fs::remove_file(self.session.new_executable_path()) {
                    debug!("Could not remove staged binary: {}", remove_err);
                }
                Err(e)
            }
        }
    }
}

impl SelfUpdater {
    /// Create an updater for the running version of this crate.
    pub fn new(config: UpgradeConfig, context: InstallContext) -> Self {
        Self {
            config,
            context,
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            lock_dir: None,
            temp_dir: std::env::temp_dir(),
            config_path: None,
        }
    }

    /// Override the version compared against the manifest.
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Directory holding `update.lock`. Without one, no cross-process lock is taken.
    pub fn with_lock_dir(mut self, dir: PathBuf) -> Self {
        self.lock_dir = Some(dir);
        self
    }

    /// Directory the updater is copied to before launch.
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Settings file the updater should read instead of the default location.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn context(&self) -> &InstallContext {
        &self.context
    }

    /// Ask the manifest whether a newer version exists. Never fails.
    pub async fn check_for_updates(&self) -> UpdateCheck {
        match ManifestFetcher::new(&self.config) {
            Ok(fetcher) => fetcher.check_for_updates(&self.current_version).await,
            Err(e) => {
                warn!("Could not create update client: {}", e);
                UpdateCheck::not_available()
            }
        }
    }

    /// Run the check on a background task.
    pub fn spawn_check(self: Arc<Self>) -> JoinHandle<UpdateCheck> {
        tokio::spawn(async move { self.check_for_updates().await })
    }

    /// Download and stage the update described by `check`.
    ///
    /// Only `on_progress` is called on the observer; completion and errors
    /// are returned.
    pub async fn stage(
        &self,
        check: &UpdateCheck,
        observer: &dyn UpdateObserver,
    ) -> Result<StagedUpdate, UpdateError> {
        let download_url = check.download_url.clone().ok_or_else(|| {
            UpdateError::ManifestInvalid {
                reason: "no download URL for this update".to_string(),
            }
        })?;

        let updater = self.preflight()?;
        let lock = self.acquire_lock()?;

        let session = UpdateSession::begin_with_update(
            self.current_version.clone(),
            check.latest_version.clone(),
            download_url,
            self.context.executable().to_path_buf(),
        )?;

        self.stage_in_session(session, check.sha256.as_deref(), updater, lock, observer).await
    }

    /// Check, then download and stage if a newer version exists.
    ///
    /// `Ok(None)` means already up to date.
    pub async fn stage_latest(
        &self,
        observer: &dyn UpdateObserver,
    ) -> Result<Option<StagedUpdate>, UpdateError> {
        let updater = self.preflight()?;

        let mut session = UpdateSession::begin(
            self.current_version.clone(),
            self.context.executable().to_path_buf(),
        )?;
        session.transition(SessionState::CheckingVersion)?;
        let check = self.check_for_updates().await;
        session.record_check(check.latest_version.clone(), check.download_url.clone())?;

        if session.state() == SessionState::Idle {
            info!("VideoDownloaderPro {} is up to date", self.current_version);
            return Ok(None);
        }

        let lock = match self.acquire_lock() {
            Ok(lock) => lock,
            Err(e) => {
                session.fail();
                return Err(e);
            }
        };

        self.stage_in_session(session, check.sha256.as_deref(), updater, lock, observer)
            .await
            .map(Some)
    }

    /// Stage the update described by `check` and hand off to the updater.
    ///
    /// On success the process exits; the function only returns on failure,
    /// after `on_error` has been called.
    pub async fn install(
        &self,
        check: &UpdateCheck,
        observer: &dyn UpdateObserver,
    ) -> Result<Infallible, UpdateError> {
        let staged = match self.stage(check, observer).await {
            Ok(staged) => staged,
            Err(e) => return Err(report_error(observer, e)),
        };
        complete(staged, observer)
    }

    /// Check, stage and hand off in one go.
    ///
    /// Returns `Ok(())` when already up to date; on success with an update the
    /// process exits.
    pub async fn update(&self, observer: &dyn UpdateObserver) -> Result<(), UpdateError> {
        match self.stage_latest(observer).await {
            Ok(Some(staged)) => complete(staged, observer).map(|never| match never {}),
            Ok(None) => Ok(()),
            Err(e) => Err(report_error(observer, e)),
        }
    }

    /// Run [`install`](Self::install) on a background task.
    pub fn spawn_install(
        self: Arc<Self>,
        check: UpdateCheck,
        observer: Arc<dyn UpdateObserver>,
    ) -> JoinHandle<Result<Infallible, UpdateError>> {
        tokio::spawn(async move { self.install(&check, observer.as_ref()).await })
    }

    /// Environment checks that need no network: packaged build, updater present.
    fn preflight(&self) -> Result<PathBuf, UpdateError> {
        self.context.ensure_packaged()?;
        locate_updater(&self.context)
    }

    fn acquire_lock(&self) -> Result<Option<UpdateLock>, UpdateError> {
        self.lock_dir.as_deref().map(UpdateLock::try_acquire).transpose()
    }

    async fn stage_in_session(
        &self,
        mut session: UpdateSession,
        sha256: Option<&str>,
        updater: PathBuf,
        lock: Option<UpdateLock>,
        observer: &dyn UpdateObserver,
    ) -> Result<StagedUpdate, UpdateError> {
        let task = match DownloadTask::new(&self.config) {
            Ok(task) => task,
            Err(e) => {
                session.fail();
                return Err(e);
            }
        };
        task.stage(&mut session, sha256, observer).await?;

        let prepared = match prepare_updater(&updater, &self.temp_dir) {
            Ok(prepared) => prepared,
            Err(e) => {
                session.fail();
                discard_staged(session.new_executable_path()).await;
                return Err(e);
            }
        };

        debug!("Update staged, updater prepared at {}", prepared.display());
        Ok(StagedUpdate {
            session,
            updater: prepared,
            config_path: self.config_path.clone(),
            _lock: lock,
        })
    }
}

fn complete(
    staged: StagedUpdate,
    observer: &dyn UpdateObserver,
) -> Result<Infallible, UpdateError> {
    observer.on_complete();
    staged.launch_and_exit().map_err(|e| report_error(observer, e))
}

fn report_error(observer: &dyn UpdateObserver, error: UpdateError) -> UpdateError {
    warn!("Update failed: {}", error);
    observer.on_error(&error.to_string());
    error
}

async fn discard_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove staging file {}: {}", path.display(), e);
    }
}
