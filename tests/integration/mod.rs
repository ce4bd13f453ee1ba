//! Integration test suite for the Paper launcher
//!
//! Every test runs against a local `wiremock` server standing in for the
//! server build feed and the launcher release feed, with retry delays
//! shrunk to milliseconds.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **fetch**: retry, backoff, staging files, and cancellation of downloads
//! - **feeds**: build feed resolution and release feed status handling
//! - **self_update**: the full self-update sequence against a fake release
//! - **server_jar**: server JAR download, reuse, and in-place update

mod feeds;
mod fetch;
mod self_update;
mod server_jar;
