//! Client for the launcher's own release feed (GitHub "latest release" API).
//!
//! Unlike the build feed this is queried once per run with no retry: an
//! unreachable feed only means "no self-update this time". Private
//! repositories answer `404` to unauthenticated requests, so a `404` is
//! reported differently depending on whether a token was sent.

use crate::core::LauncherError;
use crate::fetch::{Fetcher, read_error_body};
use crate::version::normalize;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Name used for this feed in errors and logs.
pub const RELEASE_FEED: &str = "launcher release feed";

const GITHUB_JSON: &str = "application/vnd.github.v3+json";
const OCTET_STREAM: &str = "application/octet-stream";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub id: u64,
    /// API URL of the asset; needs `Accept: application/octet-stream`.
    #[serde(default)]
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

/// The latest release as published. Fetched fresh on every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub tag: String,
    pub normalized_version: String,
    pub name: String,
    pub assets: Vec<ReleaseAsset>,
    pub notes: String,
}

impl ReleaseDescriptor {
    /// First non-blank line of the release notes.
    #[must_use]
    pub fn headline(&self) -> Option<&str> {
        self.notes.lines().map(str::trim).find(|line| !line.is_empty())
    }
}

impl From<ReleaseResponse> for ReleaseDescriptor {
    fn from(release: ReleaseResponse) -> Self {
        let normalized_version = normalize(&release.tag_name).to_string();
        Self {
            normalized_version,
            tag: release.tag_name,
            name: release.name.unwrap_or_default(),
            assets: release.assets,
            notes: release.body.unwrap_or_default(),
        }
    }
}

fn unavailable(reason: impl Into<String>) -> LauncherError {
    LauncherError::UpstreamUnavailable {
        feed: RELEASE_FEED.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone)]
pub struct ReleaseFeed {
    fetcher: Fetcher,
    url: String,
    token: Option<String>,
}

impl ReleaseFeed {
    pub fn new(fetcher: Fetcher, url: impl Into<String>, token: Option<String>) -> Self {
        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        Self {
            fetcher,
            url: url.into(),
            token,
        }
    }

    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn headers(&self, accept: &'static str) -> Result<HeaderMap, LauncherError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| LauncherError::Config {
                message: "github_token contains characters that are not allowed in an HTTP header".to_string(),
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Queries the latest release. A single attempt; honors `cancel`.
    pub async fn latest(&self, cancel: &CancellationToken) -> Result<ReleaseDescriptor, LauncherError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LauncherError::Cancelled),
            result = self.query_latest() => result,
        }
    }

    async fn query_latest(&self) -> Result<ReleaseDescriptor, LauncherError> {
        let headers = self.headers(GITHUB_JSON)?;
        let response = self.fetcher.send_once(&self.url, &headers).await.map_err(|e| match e {
            LauncherError::TransientNetwork {
                cause, ..
            } => unavailable(cause),
            other => other,
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(if self.has_token() {
                LauncherError::ReleaseFeedNotFound {
                    url: self.url.clone(),
                }
            } else {
                LauncherError::ReleaseFeedNeedsCredential {
                    url: self.url.clone(),
                }
            });
        }
        if status != StatusCode::OK {
            let body = read_error_body(response).await;
            let reason = if body.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {body}")
            };
            return Err(unavailable(reason));
        }

        let read_timeout = self.fetcher.policy().request_timeout;
        let body = match timeout(read_timeout, response.bytes()).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return Err(unavailable(format!("failed to read response: {e}"))),
            Err(_) => return Err(unavailable("timed out reading response")),
        };

        let release: ReleaseResponse = serde_json::from_slice(&body)
            .map_err(|e| unavailable(format!("malformed release descriptor: {e}")))?;
        debug!("Latest launcher release is {}", release.tag_name);
        Ok(release.into())
    }

    /// URL and headers to download `asset`.
    ///
    /// With a token the asset API URL is used (works for private
    /// repositories); otherwise the public browser download URL.
    pub fn asset_request(&self, asset: &ReleaseAsset) -> Result<(String, HeaderMap), LauncherError> {
        if self.has_token() && !asset.url.is_empty() {
            Ok((asset.url.clone(), self.headers(OCTET_STREAM)?))
        } else if !asset.browser_download_url.is_empty() {
            Ok((asset.browser_download_url.clone(), HeaderMap::new()))
        } else {
            Err(unavailable(format!("asset {} has no download URL", asset.name)))
        }
    }
}
