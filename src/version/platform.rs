//! Platform names and per-platform release asset selection.
//!
//! Release assets are named `paper-launcher-<os>-<arch>` with an `.exe`
//! suffix on Windows, where `<os>` is `windows`, `linux`, or `darwin` and
//! `<arch>` is `amd64` or `arm64`.

use crate::constants::LAUNCHER_ASSET_PREFIX;
use crate::upstream::ReleaseAsset;
use std::fmt;

/// Operating system and CPU architecture in release-asset naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// The platform this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::from_rust_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Maps Rust's `std::env::consts` names to asset naming.
    #[must_use]
    pub fn from_rust_names(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    #[must_use]
    pub fn asset_name(&self) -> Option<String> {
        asset_name_for(&self.os, &self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Asset file name for a platform, or `None` if no asset is ever published for it.
#[must_use]
pub fn asset_name_for(os: &str, arch: &str) -> Option<String> {
    let supported_os = matches!(os, "windows" | "linux" | "darwin");
    let supported_arch = matches!(arch, "amd64" | "arm64");
    if !(supported_os && supported_arch) {
        return None;
    }

    let suffix = if os == "windows" { ".exe" } else { "" };
    Some(format!("{LAUNCHER_ASSET_PREFIX}-{os}-{arch}{suffix}"))
}

/// Finds the asset for `os`/`arch` by exact name.
///
/// `None` means "no update for this platform", not an error.
#[must_use]
pub fn select_asset_for_platform<'a>(assets: &'a [ReleaseAsset], os: &str, arch: &str) -> Option<&'a ReleaseAsset> {
    let wanted = asset_name_for(os, arch)?;
    assets.iter().find(|asset| asset.name == wanted)
}
