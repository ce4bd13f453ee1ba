//! Retry policy for HTTP requests: bounded attempts with exponential backoff.
//!
//! Retries run through `tokio-retry`'s [`RetryIf`], which only spends another
//! attempt on errors where [`LauncherError::is_retryable`] holds. The whole
//! retry loop, backoff sleeps included, races the caller's
//! [`CancellationToken`], so cancellation never waits out a delay.

use crate::config::NetworkConfig;
use crate::core::LauncherError;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Upper bound on a single backoff delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Growth factor of the delay after each failure.
    pub multiplier: f64,
    /// Timeout for connecting, for response headers, and for each body chunk.
    pub request_timeout: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            multiplier: config.backoff_multiplier,
            request_timeout: config.request_timeout(),
        }
    }

    /// The delays slept between attempts: `base`, `base * m`, `base * m^2`, ...
    /// There is one fewer delay than there are attempts.
    #[must_use]
    pub fn delays(&self) -> BackoffDelays {
        BackoffDelays {
            next: self.base_delay,
            multiplier: self.multiplier,
            remaining: self.max_attempts.saturating_sub(1),
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// runs out of attempts, or `cancel` fires.
    ///
    /// A retryable error that survives the last attempt becomes
    /// [`LauncherError::FetchFailed`] carrying its cause.
    pub async fn run<T, F, Fut>(
        &self,
        url: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, LauncherError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LauncherError>>,
    {
        let attempts = AtomicU32::new(0);
        let max_attempts = self.max_attempts;

        let action = || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let future = operation();
            async move {
                let result = future.await;
                if let Err(e) = &result {
                    if e.is_retryable() && attempt < max_attempts {
                        warn!("Attempt {attempt}/{max_attempts} failed: {e}; retrying");
                    }
                }
                result
            }
        };

        let retry = RetryIf::start(self.delays(), action, |e: &LauncherError| e.is_retryable());

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LauncherError::Cancelled),
            result = retry => result,
        };

        result.map_err(|e| match e {
            LauncherError::TransientNetwork {
                cause, ..
            } => LauncherError::FetchFailed {
                url: url.to_string(),
                attempts: attempts.load(Ordering::Relaxed),
                last_cause: cause,
            },
            other => other,
        })
    }
}

/// Iterator of backoff delays handed to `tokio-retry`.
#[derive(Debug, Clone)]
pub struct BackoffDelays {
    next: Duration,
    multiplier: f64,
    remaining: u32,
}

impl Iterator for BackoffDelays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = self.next;
        self.next = Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .map_or(MAX_RETRY_DELAY, |d| d.min(MAX_RETRY_DELAY));
        Some(current)
    }
}
