//! Client for the upstream build feed of the managed server JAR.
//!
//! The feed is a three-level JSON API:
//!
//! ```text
//! GET {base}                                   -> {"versions": ["1.20.6", "1.21.4", ...]}
//! GET {base}/versions/{v}/builds               -> {"builds": [{"build": 100}, ...]}
//! GET {base}/versions/{v}/builds/{b}           -> {"downloads": {"application": {"name": "paper-1.21.4-100.jar"}}}
//! GET {base}/versions/{v}/builds/{b}/downloads/{name}   (the JAR itself)
//! ```
//!
//! The feed lists versions oldest first, so the last entry is the latest.

use crate::core::LauncherError;
use crate::fetch::Fetcher;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Name used for this feed in errors and logs.
pub const BUILD_FEED: &str = "Paper build feed";

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    #[serde(default)]
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BuildsResponse {
    #[serde(default)]
    builds: Vec<BuildEntry>,
}

#[derive(Debug, Deserialize)]
struct BuildEntry {
    build: u32,
}

#[derive(Debug, Deserialize)]
struct BuildDetails {
    downloads: Downloads,
}

#[derive(Debug, Deserialize)]
struct Downloads {
    application: Application,
}

#[derive(Debug, Deserialize)]
struct Application {
    name: String,
}

/// A concrete, downloadable build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    pub version: String,
    pub build: u32,
    pub file_name: String,
    pub url: String,
}

fn unavailable(reason: impl Into<String>) -> LauncherError {
    LauncherError::UpstreamUnavailable {
        feed: BUILD_FEED.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildFeed {
    fetcher: Fetcher,
    base_url: String,
}

impl BuildFeed {
    pub fn new(fetcher: Fetcher, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            fetcher,
            base_url,
        }
    }

    /// Newest Minecraft version the feed publishes.
    pub async fn latest_version(&self, cancel: &CancellationToken) -> Result<String, LauncherError> {
        let project: ProjectResponse =
            self.fetcher.get_json(&self.base_url, &HeaderMap::new(), BUILD_FEED, cancel).await?;
        project.versions.last().cloned().ok_or_else(|| unavailable("no versions listed"))
    }

    /// Highest build number published for `version`.
    pub async fn latest_build(&self, version: &str, cancel: &CancellationToken) -> Result<u32, LauncherError> {
        let url = format!("{}/versions/{version}/builds", self.base_url);
        let builds: BuildsResponse = self.fetcher.get_json(&url, &HeaderMap::new(), BUILD_FEED, cancel).await?;
        builds
            .builds
            .iter()
            .map(|entry| entry.build)
            .max()
            .ok_or_else(|| unavailable(format!("no builds listed for {version}")))
    }

    /// File name of the server JAR for a build.
    pub async fn download_name(
        &self,
        version: &str,
        build: u32,
        cancel: &CancellationToken,
    ) -> Result<String, LauncherError> {
        let url = format!("{}/versions/{version}/builds/{build}", self.base_url);
        let details: BuildDetails = self.fetcher.get_json(&url, &HeaderMap::new(), BUILD_FEED, cancel).await?;
        let name = details.downloads.application.name.trim().to_string();
        if name.is_empty() {
            return Err(unavailable(format!("build {build} of {version} has no application download")));
        }
        Ok(name)
    }

    #[must_use]
    pub fn download_url(&self, version: &str, build: u32, file_name: &str) -> String {
        format!("{}/versions/{version}/builds/{build}/downloads/{file_name}", self.base_url)
    }

    /// Resolves a configured version (`"latest"` or explicit) to its newest build.
    pub async fn resolve(&self, requested: &str, cancel: &CancellationToken) -> Result<BuildDescriptor, LauncherError> {
        let version = if requested.trim().eq_ignore_ascii_case("latest") {
            let latest = self.latest_version(cancel).await?;
            debug!("Resolved latest Minecraft version to {latest}");
            latest
        } else {
            requested.trim().to_string()
        };

        let build = self.latest_build(&version, cancel).await?;
        let file_name = self.download_name(&version, build, cancel).await?;
        let url = self.download_url(&version, build, &file_name);
        Ok(BuildDescriptor {
            version,
            build,
            file_name,
            url,
        })
    }

    #[must_use]
    pub const fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }
}
