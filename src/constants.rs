//! Global constants used throughout the launcher.
//!
//! This module contains network defaults, buffer sizes, and the file-name
//! conventions shared by the fetcher, the checksum store, and the self-updater.
//! Network values here are only defaults; [`crate::config::NetworkConfig`]
//! exposes every one of them as an override.

use std::time::Duration;

/// Default `User-Agent` sent with every HTTP request.
pub const DEFAULT_USER_AGENT: &str = concat!("paper-launcher/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout (30 seconds).
///
/// Applied to connecting, to receiving response headers, and to each body
/// chunk of a streamed download (a stall timeout rather than a total one).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum number of attempts for a single HTTP GET.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry (2 seconds).
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 2_000;

/// Default multiplier applied to the retry delay after each failed attempt.
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;

/// Read buffer used when streaming a file through SHA-256 (32 KiB).
pub const CHECKSUM_BUFFER_SIZE: usize = 32 * 1024;

/// Suffix of the checksum sidecar written next to an artifact.
pub const SIDECAR_SUFFIX: &str = ".sha256";

/// Suffix of an in-progress download.
pub const PART_SUFFIX: &str = ".part";

/// Suffix of a downloaded-but-not-yet-installed launcher executable.
pub const STAGED_SUFFIX: &str = ".new";

/// Suffix of the one-generation backup made before a swap.
pub const BACKUP_SUFFIX: &str = ".old";

/// Upstream build feed for the managed server artifact.
pub const DEFAULT_BUILD_FEED_URL: &str = "https://api.papermc.io/v2/projects/paper";

/// Release feed the launcher updates itself from.
pub const DEFAULT_RELEASE_FEED_URL: &str =
    "https://api.github.com/repos/nevcea/minecraft-server-launcher/releases/latest";

/// File-name prefix of the launcher's per-platform release assets.
pub const LAUNCHER_ASSET_PREFIX: &str = "paper-launcher";

/// Maximum number of bytes of an error response body kept for diagnostics.
pub const ERROR_BODY_LIMIT: usize = 4096;

/// Grace period a server process gets to exit after cancellation before it is killed.
pub const SERVER_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
