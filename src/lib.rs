//! Paper server launcher
//!
//! Prepares and runs a Paper Minecraft server: it keeps the server JAR
//! downloaded and verified, keeps itself up to date from its release feed,
//! backs up worlds, and starts the JVM with tuned flags.
//!
//! # Architecture Overview
//!
//! The core is an integrity-verified acquisition and update pipeline used
//! for both the server JAR and the launcher's own executable:
//!
//! ```text
//! upstream (build feed / release feed)
//!     -> fetch (retry + backoff, streamed into <target>.part)
//!     -> artifact (archive structure) + checksum (SHA-256 sidecar)
//!     -> upgrade (self-update: <exe>.new -> swap with <exe>.old backup)
//! ```
//!
//! # Core Modules
//!
//! - [`checksum`] - SHA-256 digests and `.sha256` sidecar files
//! - [`artifact`] - structural validation of ZIP/JAR archives
//! - [`fetch`] - resilient HTTP downloads with retry, backoff, and cancellation
//! - [`version`] - version comparison and platform asset names
//! - [`upstream`] - the server build feed and the launcher release feed
//! - [`upgrade`] - the self-update sequence and `.old` backups
//!
//! # Supporting Modules
//!
//! - [`server`] - server JAR handling, Java detection, memory, JVM process, EULA
//! - [`world_backup`] - pre-launch world archives with rotation
//! - [`config`] - `config.yaml` loading, defaults, and environment overrides
//! - [`context`] - per-run shared state (HTTP client, token, cancellation)
//! - [`core`] - error types and user-facing error rendering
//! - [`cli`] - command-line flags and the launch sequence
//! - [`utils`] - filesystem helpers, progress bars, logging setup
//!
//! # Files Next to a Managed Artifact
//!
//! | File | Meaning |
//! |---|---|
//! | `<name>.sha256` | trusted SHA-256 of `<name>` |
//! | `<name>.part` | interrupted download, deleted on the next run |
//! | `<name>.new` | downloaded launcher update awaiting install |
//! | `<name>.old` | previous generation kept by the last swap |

// Core pipeline
pub mod artifact;
pub mod checksum;
pub mod fetch;
pub mod upgrade;
pub mod upstream;
pub mod version;

// Launcher
pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod core;
pub mod server;
pub mod utils;
pub mod world_backup;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
