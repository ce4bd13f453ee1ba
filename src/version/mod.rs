//! Version comparison and release asset selection.
//!
//! The same comparison logic serves both update paths:
//! - the server JAR's build feed (a newer build of the same Minecraft version)
//! - the launcher's own release feed (a newer tagged release)
//!
//! # Module Organization
//!
//! - [`comparison`] - [`normalize`], [`compare`], [`is_newer`]
//! - [`platform`] - [`Platform`] names and [`select_asset_for_platform`]

pub mod comparison;
pub mod platform;

pub use comparison::{compare, is_development_version, is_newer, normalize};
pub use platform::{Platform, asset_name_for, select_asset_for_platform};

/// The launcher's own version.
///
/// Taken from `PAPER_LAUNCHER_VERSION` at build time if set (release builds
/// stamp the tag here), otherwise from the crate version.
#[must_use]
pub fn current_launcher_version() -> &'static str {
    option_env!("PAPER_LAUNCHER_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
