//! File system helpers shared by the fetcher, the checksum store, and the updaters.
//!
//! - [`atomic`] - temp-and-rename writes and cross-platform file replacement
//! - [`staging`] - RAII guard for in-progress `.part` downloads

pub mod atomic;
pub mod staging;

pub use atomic::{atomic_write, remove_if_exists, replace_file, set_executable};
pub use staging::StagingFile;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Returns `path` with `suffix` appended to its file name.
///
/// Unlike [`Path::with_extension`] this never replaces an existing extension:
/// `server.jar` + `.sha256` is `server.jar.sha256`.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Ensures a directory exists, creating all parents as needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(path)
}
