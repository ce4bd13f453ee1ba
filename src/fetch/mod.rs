//! Resilient HTTP fetcher
//!
//! Every network read the launcher performs goes through [`Fetcher`]:
//! - JSON feed reads ([`Fetcher::get_json`])
//! - artifact downloads ([`Fetcher::fetch`], [`Fetcher::fetch_with_headers`])
//! - single-shot requests whose status the caller interprets ([`Fetcher::send_once`])
//!
//! # Download protocol
//!
//! 1. `GET` with a request timeout and the launcher's `User-Agent`.
//! 2. Transport failures and any status other than `200` are retried with
//!    exponential backoff (see [`RetryPolicy`]).
//! 3. The body streams into `<dest>.part`; a stale `.part` from an earlier
//!    run is deleted first, never resumed.
//! 4. Each body chunk must arrive within the request timeout (a stall
//!    timeout, so slow but steady large downloads still complete).
//! 5. The finished `.part` is flushed, closed, and renamed over `<dest>`.
//!
//! Any failure or cancellation removes the `.part` file through the
//! [`StagingFile`] guard, so `<dest>` is either untouched or fully replaced.

pub mod retry;

pub use retry::{BackoffDelays, RetryPolicy};

use crate::config::NetworkConfig;
use crate::constants::ERROR_BODY_LIMIT;
use crate::core::LauncherError;
use crate::utils::fs::{StagingFile, ensure_dir};
use crate::utils::progress::ProgressBar;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// HTTP client with retry, timeouts, cancellation, and staged downloads.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    show_progress: bool,
}

fn transient(url: &str, status: Option<u16>, cause: impl Into<String>) -> LauncherError {
    LauncherError::TransientNetwork {
        url: url.to_string(),
        status,
        cause: cause.into(),
    }
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_connect() {
        format!("connection failed: {e}")
    } else if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    }
}

impl Fetcher {
    /// Builds a fetcher from the `network:` configuration.
    pub fn new(config: &NetworkConfig) -> Result<Self, LauncherError> {
        let policy = RetryPolicy::from_config(config);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(policy.request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| LauncherError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            policy,
            show_progress: true,
        })
    }

    /// Enables or disables the download progress bar.
    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends one `GET` and returns the response whatever its status.
    ///
    /// Only transport failures and the header timeout are errors here, both
    /// as [`LauncherError::TransientNetwork`]. No retry.
    pub async fn send_once(&self, url: &str, headers: &HeaderMap) -> Result<Response, LauncherError> {
        debug!("GET {url}");
        let request = self.client.get(url).headers(headers.clone()).send();
        match timeout(self.policy.request_timeout, request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(transient(url, None, describe_reqwest_error(&e))),
            Err(_) => Err(transient(
                url,
                None,
                format!("no response within {}s", self.policy.request_timeout.as_secs()),
            )),
        }
    }

    /// Sends one `GET` and fails with a retryable error unless the status is `200`.
    async fn send_expecting_ok(&self, url: &str, headers: &HeaderMap) -> Result<Response, LauncherError> {
        let response = self.send_once(url, headers).await?;
        let status = response.status();
        if status == StatusCode::OK {
            Ok(response)
        } else {
            Err(transient(url, Some(status.as_u16()), format!("HTTP {status}")))
        }
    }

    /// Reads the next body chunk, failing if none arrives within the request timeout.
    async fn next_chunk(&self, url: &str, response: &mut Response) -> Result<Option<Bytes>, LauncherError> {
        match timeout(self.policy.request_timeout, response.chunk()).await {
            Ok(Ok(chunk)) => Ok(chunk),
            Ok(Err(e)) => Err(transient(url, None, format!("body read failed: {}", describe_reqwest_error(&e)))),
            Err(_) => Err(transient(
                url,
                None,
                format!("download stalled for {}s", self.policy.request_timeout.as_secs()),
            )),
        }
    }

    /// `GET` with retry, returning the full body.
    pub async fn get_bytes(
        &self,
        url: &str,
        headers: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, LauncherError> {
        self.policy
            .run(url, cancel, || async {
                let mut response = self.send_expecting_ok(url, headers).await?;
                let mut body = Vec::new();
                while let Some(chunk) = self.next_chunk(url, &mut response).await? {
                    body.extend_from_slice(&chunk);
                }
                Ok(body)
            })
            .await
    }

    /// `GET` with retry, decoding the body as JSON.
    ///
    /// A body that does not decode is [`LauncherError::UpstreamUnavailable`]
    /// and is not retried.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &HeaderMap,
        feed: &str,
        cancel: &CancellationToken,
    ) -> Result<T, LauncherError> {
        let body = self.get_bytes(url, headers, cancel).await?;
        serde_json::from_slice(&body).map_err(|e| LauncherError::UpstreamUnavailable {
            feed: feed.to_string(),
            reason: format!("malformed response from {url}: {e}"),
        })
    }

    /// Downloads `url` to `dest`. Returns the number of bytes written.
    pub async fn fetch(&self, url: &str, dest: &Path, cancel: &CancellationToken) -> Result<u64, LauncherError> {
        self.fetch_with_headers(url, &HeaderMap::new(), dest, cancel).await
    }

    /// Downloads `url` to `dest` with extra request headers.
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        headers: &HeaderMap,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, LauncherError> {
        if let Some(parent) = dest.parent() {
            ensure_dir(parent).map_err(|e| LauncherError::fs("create directory", parent, e))?;
        }

        info!("Downloading {url}");
        let written = self.policy.run(url, cancel, || self.download_once(url, headers, dest)).await?;
        info!("Downloaded {} ({written} bytes)", dest.display());
        Ok(written)
    }

    /// One download attempt: request, stream into `.part`, rename into place.
    async fn download_once(&self, url: &str, headers: &HeaderMap, dest: &Path) -> Result<u64, LauncherError> {
        let mut response = self.send_expecting_ok(url, headers).await?;
        // Read before streaming; reqwest reports the remaining length once the body is consumed.
        let expected_len = response.content_length();

        let staging = StagingFile::prepare(dest)?;
        let mut file = tokio::fs::File::create(staging.path())
            .await
            .map_err(|e| LauncherError::fs("create", staging.path(), e))?;

        let label = dest.file_name().map_or_else(|| url.to_string(), |n| n.to_string_lossy().into_owned());
        let progress = if self.show_progress {
            ProgressBar::new_bytes(expected_len, label)
        } else {
            ProgressBar::hidden()
        };

        let mut written: u64 = 0;
        loop {
            let chunk = match self.next_chunk(url, &mut response).await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            };
            file.write_all(&chunk).await.map_err(|e| LauncherError::fs("write", staging.path(), e))?;
            written += chunk.len() as u64;
            progress.inc(chunk.len() as u64);
        }

        file.flush().await.map_err(|e| LauncherError::fs("flush", staging.path(), e))?;
        file.sync_all().await.map_err(|e| LauncherError::fs("sync", staging.path(), e))?;
        drop(file);
        progress.finish_and_clear();

        if let Some(expected) = expected_len {
            if expected != written {
                return Err(transient(
                    url,
                    None,
                    format!("body ended after {written} of {expected} bytes"),
                ));
            }
        }

        staging.persist()?;
        Ok(written)
    }
}

/// Reads at most [`ERROR_BODY_LIMIT`] bytes of a response body for diagnostics.
pub async fn read_error_body(mut response: Response) -> String {
    let mut body = Vec::new();
    while body.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    body.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body).trim().to_string()
}
