//! One-generation `.old` backups around a file swap.
//!
//! [`BackupManager`] moves a live file aside to `<name>.old` and can put it
//! back. It is used for two swaps:
//! - the launcher replacing its own executable ([`BackupManager::swap_in`])
//! - the server JAR being replaced by a newer build
//!
//! Every operation here is synchronous. A swap must never be abandoned half
//! way, and a function with no await points cannot be dropped mid-sequence
//! by cancellation.

use crate::constants::BACKUP_SUFFIX;
use crate::core::LauncherError;
use crate::utils::fs::{remove_if_exists, replace_file, with_suffix};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Manages `<file>.old`, the single backup generation of `<file>`.
///
/// A new backup always replaces the previous one.
#[derive(Debug, Clone)]
pub struct BackupManager {
    original_path: PathBuf,
    backup_path: PathBuf,
}

impl BackupManager {
    pub fn new(original_path: impl Into<PathBuf>) -> Self {
        let original_path = original_path.into();
        let backup_path = with_suffix(&original_path, BACKUP_SUFFIX);
        Self {
            original_path,
            backup_path,
        }
    }

    /// Renames the live file to `<file>.old`, deleting any previous backup first.
    pub fn move_aside(&self) -> Result<(), LauncherError> {
        if remove_if_exists(&self.backup_path)
            .map_err(|e| LauncherError::fs("remove previous backup", &self.backup_path, e))?
        {
            debug!("Removed previous backup {}", self.backup_path.display());
        }

        std::fs::rename(&self.original_path, &self.backup_path)
            .map_err(|e| LauncherError::fs("back up", &self.original_path, e))?;
        info!("Backed up {} to {}", self.original_path.display(), self.backup_path.display());
        Ok(())
    }

    /// Renames `<file>.old` back to the live path.
    pub fn restore_backup(&self) -> io::Result<()> {
        warn!("Restoring {} from {}", self.original_path.display(), self.backup_path.display());
        replace_file(&self.backup_path, &self.original_path)
    }

    /// Replaces the live file with `staged`, keeping the previous one as `<file>.old`.
    ///
    /// 1. any existing `<file>.old` is deleted
    /// 2. the live file is renamed to `<file>.old`
    /// 3. `staged` is renamed to the live path
    ///
    /// If step 3 fails the backup is renamed back immediately. The error is
    /// [`LauncherError::InstallFailedRestored`] when that works and
    /// [`LauncherError::InstallFailedUnrecoverable`] when it does not, in
    /// which case the live path may not exist and the backup must be
    /// recovered by hand.
    pub fn swap_in(&self, staged: &Path) -> Result<(), LauncherError> {
        self.move_aside().map_err(|e| LauncherError::InstallFailedRestored {
            cause: e.to_string(),
        })?;

        let Err(install_error) = std::fs::rename(staged, &self.original_path) else {
            return Ok(());
        };

        let cause = format!("failed to move {} into place: {install_error}", staged.display());
        match self.restore_backup() {
            Ok(()) => {
                warn!("Install failed, previous file restored: {cause}");
                Err(LauncherError::InstallFailedRestored {
                    cause,
                })
            }
            Err(restore_error) => {
                error!(
                    "Install failed and restore failed; previous file remains at {}",
                    self.backup_path.display()
                );
                Err(LauncherError::InstallFailedUnrecoverable {
                    cause,
                    restore_cause: restore_error.to_string(),
                    backup: self.backup_path.clone(),
                })
            }
        }
    }

    /// Deletes the backup. Returns `true` if there was one.
    pub fn cleanup_backup(&self) -> io::Result<bool> {
        remove_if_exists(&self.backup_path)
    }

    #[must_use]
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    #[must_use]
    pub fn original_path(&self) -> &Path {
        &self.original_path
    }
}
