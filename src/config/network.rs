//! Network tuning for the resilient fetcher and the upstream feeds.

use crate::constants::{
    DEFAULT_BUILD_FEED_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_RELEASE_FEED_URL, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MULTIPLIER, DEFAULT_USER_AGENT,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The `network:` section of `config.yaml`.
///
/// Every field is optional in the file; omitted fields take the defaults in
/// [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Attempts per HTTP GET, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Factor applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Connect, response-header, and per-chunk stall timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Base URL of the upstream build feed for the server JAR.
    #[serde(default = "default_build_feed_url")]
    pub build_feed_url: String,

    /// URL of the launcher's "latest release" descriptor.
    #[serde(default = "default_release_feed_url")]
    pub release_feed_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            build_feed_url: default_build_feed_url(),
            release_feed_url: default_release_feed_url(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

const fn default_backoff_multiplier() -> f64 {
    DEFAULT_RETRY_MULTIPLIER
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_build_feed_url() -> String {
    DEFAULT_BUILD_FEED_URL.to_string()
}

fn default_release_feed_url() -> String {
    DEFAULT_RELEASE_FEED_URL.to_string()
}

impl NetworkConfig {
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks the values that would make the fetcher misbehave.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts < 1 {
            return Err("network.max_attempts must be at least 1".to_string());
        }
        if !(self.backoff_multiplier >= 1.0) {
            return Err("network.backoff_multiplier must be at least 1.0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("network.request_timeout_secs must be greater than 0".to_string());
        }
        if self.build_feed_url.trim().is_empty() || self.release_feed_url.trim().is_empty() {
            return Err("network feed URLs cannot be empty".to_string());
        }
        Ok(())
    }
}
