use crate::constants::STAGED_SUFFIX;
use crate::context::LaunchContext;
use crate::core::LauncherError;
use crate::fetch::Fetcher;
use crate::upgrade::backup::BackupManager;
use crate::upstream::{ReleaseAsset, ReleaseDescriptor, ReleaseFeed};
use crate::utils::fs::{remove_if_exists, set_executable, with_suffix};
use crate::version::{Platform, is_development_version, is_newer, normalize, select_asset_for_platform};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where the self-update sequence currently is.
///
/// ```text
/// Idle -> Checking -> UpdateAvailable -> Downloading -> Validating -> Installing -> Done
///            |
///            +-> NoUpdate                       (any state) -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Checking,
    UpdateAvailable,
    Downloading,
    Validating,
    Installing,
    Done,
    NoUpdate,
    Failed,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::UpdateAvailable => "update available",
            Self::Downloading => "downloading",
            Self::Validating => "validating",
            Self::Installing => "installing",
            Self::Done => "done",
            Self::NoUpdate => "no update",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a check ended without an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoUpdateReason {
    /// The running build is unversioned.
    DevelopmentBuild,
    /// The latest release is not newer than the running one.
    UpToDate {
        latest: String,
    },
    /// A newer release exists but has no asset for this platform.
    NoPlatformAsset {
        latest: String,
        platform: Platform,
    },
    /// The release feed could not be used this run.
    CheckFailed {
        reason: String,
    },
}

/// A newer release with an asset for this platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableUpdate {
    pub release: ReleaseDescriptor,
    pub asset: ReleaseAsset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    NoUpdate(NoUpdateReason),
    Available(AvailableUpdate),
}

/// How a full self-update run ended.
#[derive(Debug)]
pub enum UpdateOutcome {
    NoUpdate(NoUpdateReason),
    /// An update was available but not confirmed.
    Declined {
        version: String,
    },
    /// The new executable is in place; a restart is required to run it.
    Installed {
        version: String,
    },
    /// The update failed and the running executable is untouched or restored.
    Failed {
        error: LauncherError,
    },
}

/// Self-update sequencer for the launcher executable.
///
/// `SelfUpdater` walks the [`UpdateState`] machine: it queries the release
/// feed, downloads the platform asset to `<exe>.new`, checks it, and swaps it
/// in with a `.old` backup through [`BackupManager`].
///
/// Failures while downloading or validating leave the running executable
/// untouched and remove the staged file. Installation is synchronous and
/// cannot be interrupted by cancellation once started.
///
/// # Examples
///
/// ```rust,no_run
/// use paper_launcher::config::LauncherConfig;
/// use paper_launcher::context::LaunchContext;
/// use paper_launcher::upgrade::{SelfUpdater, UpdateOutcome};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = LauncherConfig::default();
/// let ctx = LaunchContext::new(&config, CancellationToken::new(), true)?;
/// let mut updater = SelfUpdater::new(&ctx)?.auto_install(true);
///
/// if let UpdateOutcome::Installed { version } = updater.run(|_| std::future::ready(false)).await? {
///     println!("Updated to {version}; restart the launcher");
/// }
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater {
    feed: ReleaseFeed,
    fetcher: Fetcher,
    current_version: String,
    platform: Platform,
    executable: PathBuf,
    auto_install: bool,
    cancel: CancellationToken,
    state: UpdateState,
}

impl SelfUpdater {
    /// Creates an updater for the running executable.
    pub fn new(ctx: &LaunchContext) -> Result<Self, LauncherError> {
        let executable = std::env::current_exe()
            .map_err(|e| LauncherError::fs("locate running executable", PathBuf::from("<current exe>"), e))?;
        Ok(Self::for_executable(ctx, executable))
    }

    /// Creates an updater that replaces `executable` instead of the running binary.
    pub fn for_executable(ctx: &LaunchContext, executable: impl Into<PathBuf>) -> Self {
        Self {
            feed: ctx.release_feed(),
            fetcher: ctx.fetcher.clone(),
            current_version: ctx.current_version.clone(),
            platform: ctx.platform.clone(),
            executable: executable.into(),
            auto_install: false,
            cancel: ctx.cancel.clone(),
            state: UpdateState::Idle,
        }
    }

    /// Install without asking when an update is found.
    #[must_use]
    pub const fn auto_install(mut self, auto_install: bool) -> Self {
        self.auto_install = auto_install;
        self
    }

    #[must_use]
    pub const fn state(&self) -> UpdateState {
        self.state
    }

    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// `<exe>.new`, where a downloaded update waits before installation.
    #[must_use]
    pub fn staged_path(&self) -> PathBuf {
        with_suffix(&self.executable, STAGED_SUFFIX)
    }

    fn transition(&mut self, next: UpdateState) {
        debug!("Self-update: {} -> {next}", self.state);
        self.state = next;
    }

    fn fail(&mut self, error: LauncherError) -> LauncherError {
        self.transition(UpdateState::Failed);
        error
    }

    /// Queries the release feed and decides whether an update applies.
    pub async fn check(&mut self) -> Result<UpdateCheck, LauncherError> {
        self.transition(UpdateState::Checking);

        if is_development_version(&self.current_version) {
            info!("Development build; skipping launcher update check");
            self.transition(UpdateState::NoUpdate);
            return Ok(UpdateCheck::NoUpdate(NoUpdateReason::DevelopmentBuild));
        }

        let release = match self.feed.latest(&self.cancel).await {
            Ok(release) => release,
            Err(e) => return Err(self.fail(e)),
        };

        if !is_newer(&release.tag, &self.current_version) {
            debug!("Launcher is up to date ({} >= {})", normalize(&self.current_version), release.normalized_version);
            self.transition(UpdateState::NoUpdate);
            return Ok(UpdateCheck::NoUpdate(NoUpdateReason::UpToDate {
                latest: release.normalized_version,
            }));
        }

        let Some(asset) = select_asset_for_platform(&release.assets, &self.platform.os, &self.platform.arch).cloned()
        else {
            warn!(
                "Launcher {} is available but has no build for {}",
                release.normalized_version, self.platform
            );
            self.transition(UpdateState::NoUpdate);
            return Ok(UpdateCheck::NoUpdate(NoUpdateReason::NoPlatformAsset {
                latest: release.normalized_version,
                platform: self.platform.clone(),
            }));
        };

        info!("New launcher version available: {}", release.tag);
        if let Some(headline) = release.headline() {
            info!("Release notes: {headline}");
        }
        self.transition(UpdateState::UpdateAvailable);
        Ok(UpdateCheck::Available(AvailableUpdate {
            release,
            asset,
        }))
    }

    /// Downloads the update to [`Self::staged_path`].
    pub async fn download(&mut self, update: &AvailableUpdate) -> Result<PathBuf, LauncherError> {
        self.transition(UpdateState::Downloading);
        let staged = self.staged_path();

        let result = async {
            let (url, headers) = self.feed.asset_request(&update.asset)?;
            self.fetcher.fetch_with_headers(&url, &headers, &staged, &self.cancel).await?;
            set_executable(&staged).map_err(|e| LauncherError::fs("set permissions on", &staged, e))
        }
        .await;

        match result {
            Ok(()) => Ok(staged),
            Err(e) => {
                discard_staged(&staged);
                Err(self.fail(e))
            }
        }
    }

    /// Minimal integrity check of a staged executable: present, non-empty, readable.
    ///
    /// The staged file is removed if the check fails.
    pub fn validate(&mut self, staged: &Path) -> Result<(), LauncherError> {
        self.transition(UpdateState::Validating);

        match check_staged(staged) {
            Ok(()) => Ok(()),
            Err(reason) => {
                discard_staged(staged);
                Err(self.fail(LauncherError::StagedUpdateInvalid {
                    path: staged.to_path_buf(),
                    reason,
                }))
            }
        }
    }

    /// Swaps the staged executable in, keeping `<exe>.old`.
    pub fn install(&mut self, staged: &Path) -> Result<(), LauncherError> {
        self.transition(UpdateState::Installing);

        let backup = BackupManager::new(&self.executable);
        if let Err(e) = backup.swap_in(staged) {
            if !matches!(e, LauncherError::InstallFailedUnrecoverable { .. }) {
                discard_staged(staged);
            }
            return Err(self.fail(e));
        }

        // The rename carries the staged file's mode over, but be explicit
        if let Err(e) = set_executable(&self.executable) {
            warn!("Failed to set executable permission on {}: {e}", self.executable.display());
        }

        self.transition(UpdateState::Done);
        Ok(())
    }

    /// Runs the whole sequence once.
    ///
    /// `confirm` is awaited when an update is available and auto-install is
    /// off; cancellation while it is pending ends the run. Only cancellation and [`LauncherError::InstallFailedUnrecoverable`]
    /// are returned as errors; every other failure is reported as
    /// [`UpdateOutcome::Failed`] or [`NoUpdateReason::CheckFailed`] since the
    /// running executable is still usable.
    pub async fn run<F, Fut>(&mut self, confirm: F) -> Result<UpdateOutcome, LauncherError>
    where
        F: FnOnce(&AvailableUpdate) -> Fut,
        Fut: Future<Output = bool>,
    {
        let update = match self.check().await {
            Ok(UpdateCheck::Available(update)) => update,
            Ok(UpdateCheck::NoUpdate(reason)) => return Ok(UpdateOutcome::NoUpdate(reason)),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Failed to check for launcher updates: {e}");
                return Ok(UpdateOutcome::NoUpdate(NoUpdateReason::CheckFailed {
                    reason: e.to_string(),
                }));
            }
        };

        let version = update.release.normalized_version.clone();
        if self.auto_install {
            info!("Auto-updating launcher to {version}");
        } else {
            let accepted = tokio::select! {
                () = self.cancel.cancelled() => return Err(LauncherError::Cancelled),
                accepted = confirm(&update) => accepted,
            };
            if !accepted {
                info!("Launcher update to {version} declined");
                return Ok(UpdateOutcome::Declined {
                    version,
                });
            }
        }

        let staged = match self.download(&update).await {
            Ok(staged) => staged,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Failed to download launcher update: {e}");
                return Ok(UpdateOutcome::Failed {
                    error: e,
                });
            }
        };

        if let Err(e) = self.validate(&staged) {
            warn!("Launcher update validation failed: {e}");
            return Ok(UpdateOutcome::Failed {
                error: e,
            });
        }

        match self.install(&staged) {
            Ok(()) => {
                info!("Launcher updated to {version}; restart to use it");
                Ok(UpdateOutcome::Installed {
                    version,
                })
            }
            Err(e @ LauncherError::InstallFailedUnrecoverable { .. }) => Err(e),
            Err(e) => {
                warn!("Failed to install launcher update: {e}");
                Ok(UpdateOutcome::Failed {
                    error: e,
                })
            }
        }
    }
}

fn check_staged(staged: &Path) -> Result<(), String> {
    let metadata = std::fs::metadata(staged).map_err(|e| format!("cannot stat: {e}"))?;
    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }
    if metadata.len() == 0 {
        return Err("file is empty".to_string());
    }
    let mut first = [0u8; 1];
    std::fs::File::open(staged)
        .and_then(|mut file| file.read_exact(&mut first))
        .map_err(|e| format!("cannot read: {e}"))
}

fn discard_staged(staged: &Path) {
    match remove_if_exists(staged) {
        Ok(true) => debug!("Removed staged update {}", staged.display()),
        Ok(false) => {}
        Err(e) => warn!("Failed to remove staged update {}: {e}", staged.display()),
    }
}
