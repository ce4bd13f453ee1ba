//! Per-run launch context.
//!
//! Everything the update and acquisition paths share is built once at
//! startup and passed by reference: the HTTP client, the launcher's own
//! version, the release-feed token, the feed URLs, and the cancellation
//! token wired to Ctrl-C / SIGTERM. There is no process-wide mutable state.

use crate::config::LauncherConfig;
use crate::core::LauncherError;
use crate::fetch::Fetcher;
use crate::upstream::{BuildFeed, ReleaseFeed};
use crate::version::{Platform, current_launcher_version};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub fetcher: Fetcher,
    /// Version of the running launcher; `"dev"` or empty for development builds.
    pub current_version: String,
    pub github_token: Option<String>,
    pub build_feed_url: String,
    pub release_feed_url: String,
    pub platform: Platform,
    pub cancel: CancellationToken,
}

impl LaunchContext {
    /// Builds the context from a validated configuration.
    pub fn new(
        config: &LauncherConfig,
        cancel: CancellationToken,
        show_progress: bool,
    ) -> Result<Self, LauncherError> {
        let fetcher = Fetcher::new(&config.network)?.with_progress(show_progress);
        Ok(Self {
            fetcher,
            current_version: current_launcher_version().to_string(),
            github_token: config.token(),
            build_feed_url: config.network.build_feed_url.clone(),
            release_feed_url: config.network.release_feed_url.clone(),
            platform: Platform::current(),
            cancel,
        })
    }

    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn build_feed(&self) -> BuildFeed {
        BuildFeed::new(self.fetcher.clone(), self.build_feed_url.clone())
    }

    #[must_use]
    pub fn release_feed(&self) -> ReleaseFeed {
        ReleaseFeed::new(self.fetcher.clone(), self.release_feed_url.clone(), self.github_token.clone())
    }
}
