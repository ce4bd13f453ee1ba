//! Atomic file operations using the temp-and-rename strategy.
//!
//! Readers never observe a partially written file at the final path: content is
//! written to a sibling, synced, and renamed into place.

use super::{ensure_dir, with_suffix};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Atomically writes bytes to `path`.
///
/// The content goes to `<path>.tmp` first, is synced to disk, and is then
/// moved over the destination with [`replace_file`].
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = with_suffix(path, ".tmp");
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    if let Err(e) = replace_file(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

/// Moves `src` over `dest`, replacing any existing file.
///
/// On Unix `rename(2)` replaces the destination atomically. On Windows the
/// rename fails if the destination exists, so the destination is removed
/// immediately before retrying; there is a brief window in which `dest`
/// does not exist.
pub fn replace_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if cfg!(windows) && dest.exists() => {
            tracing::debug!("Rename over {} failed ({e}), removing destination first", dest.display());
            fs::remove_file(dest)?;
            fs::rename(src, dest)
        }
        Err(e) => Err(e),
    }
}

/// Removes a file, treating "not found" as success.
///
/// Returns `true` if a file was actually removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Marks a file executable for owner, group, and others (`0o755`).
///
/// A no-op on platforms without Unix permission bits.
#[cfg(unix)]
pub fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
