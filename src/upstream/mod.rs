//! Clients for the two upstream feeds.
//!
//! - [`build_feed`] - versions, builds, and JAR downloads for the server
//! - [`release_feed`] - the launcher's own latest release
//!
//! Both surface malformed or unusable responses as
//! [`LauncherError::UpstreamUnavailable`](crate::core::LauncherError::UpstreamUnavailable),
//! which update checks treat as non-fatal.

pub mod build_feed;
pub mod release_feed;

pub use build_feed::{BUILD_FEED, BuildDescriptor, BuildFeed};
pub use release_feed::{RELEASE_FEED, ReleaseAsset, ReleaseDescriptor, ReleaseFeed};
