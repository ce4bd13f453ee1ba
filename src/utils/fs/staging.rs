//! In-progress download files with RAII cleanup.
//!
//! A [`StagingFile`] owns `<dest>.part` for the duration of a download. If the
//! guard is dropped without [`StagingFile::persist`] being called (error,
//! cancellation, panic), the partial file is removed, so an interrupted
//! download never leaves a `.part` behind and never touches `dest`.

use super::{remove_if_exists, replace_file, with_suffix};
use crate::constants::PART_SUFFIX;
use crate::core::LauncherError;
use std::path::{Path, PathBuf};

pub struct StagingFile {
    part: PathBuf,
    dest: PathBuf,
    persisted: bool,
}

impl StagingFile {
    /// Prepares `<dest>.part`, removing a stale one left by an earlier crash.
    pub fn prepare(dest: &Path) -> Result<Self, LauncherError> {
        let part = with_suffix(dest, PART_SUFFIX);
        if remove_if_exists(&part).map_err(|e| LauncherError::fs("remove stale", &part, e))? {
            tracing::debug!("Removed stale partial download {}", part.display());
        }
        Ok(Self {
            part,
            dest: dest.to_path_buf(),
            persisted: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.part
    }

    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Moves the completed `.part` file over the destination.
    ///
    /// The caller must have flushed and closed its handle to the `.part` file.
    pub fn persist(mut self) -> Result<PathBuf, LauncherError> {
        replace_file(&self.part, &self.dest)
            .map_err(|e| LauncherError::fs("move download into place at", &self.dest, e))?;
        self.persisted = true;
        Ok(self.dest.clone())
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = std::fs::remove_file(&self.part);
        }
    }
}
