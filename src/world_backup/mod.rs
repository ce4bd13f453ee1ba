//! Pre-launch world backups.
//!
//! Each configured world directory that exists is zipped into a single
//! `backup-YYYY-MM-DD_HH-MM-SS.zip` in the backup directory, after which
//! only the newest `backup_count` archives are kept. The archive is written
//! to a `.part` file first so an interrupted backup never looks complete.
//! `session.lock` is skipped since the server holds it open.

use crate::config::LauncherConfig;
use crate::core::LauncherError;
use crate::utils::fs::{StagingFile, ensure_dir};
use chrono::Local;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const BACKUP_PREFIX: &str = "backup-";
const BACKUP_EXTENSION: &str = ".zip";
const SESSION_LOCK: &str = "session.lock";

/// World backup settings resolved against the server's working directory.
#[derive(Debug, Clone)]
pub struct WorldBackup {
    work_dir: PathBuf,
    backup_dir: PathBuf,
    worlds: Vec<String>,
    retention: usize,
}

impl WorldBackup {
    pub fn new(work_dir: impl Into<PathBuf>, backup_dir: impl AsRef<Path>, worlds: Vec<String>, retention: usize) -> Self {
        let work_dir = work_dir.into();
        let backup_dir = work_dir.join(backup_dir);
        Self {
            work_dir,
            backup_dir,
            worlds,
            retention: retention.max(1),
        }
    }

    pub fn from_config(config: &LauncherConfig, work_dir: &Path) -> Self {
        Self::new(work_dir, &config.backup_dir, config.backup_worlds.clone(), config.backup_count)
    }

    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// World directories that exist, relative to the working directory.
    #[must_use]
    pub fn existing_worlds(&self) -> Vec<&str> {
        self.worlds.iter().map(String::as_str).filter(|world| self.work_dir.join(world).is_dir()).collect()
    }

    /// Creates a new backup archive and rotates old ones.
    ///
    /// Returns the archive path, or `None` when none of the worlds exist.
    /// A failed rotation is only logged.
    pub fn run(&self) -> Result<Option<PathBuf>, LauncherError> {
        let worlds = self.existing_worlds();
        if worlds.is_empty() {
            info!("No worlds found to back up, skipping backup");
            return Ok(None);
        }

        ensure_dir(&self.backup_dir).map_err(|e| LauncherError::fs("create directory", &self.backup_dir, e))?;

        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let archive = self.backup_dir.join(format!("{BACKUP_PREFIX}{timestamp}{BACKUP_EXTENSION}"));
        info!("Creating backup: {}", archive.display());

        let staging = StagingFile::prepare(&archive)?;
        self.write_archive(staging.path(), &worlds)
            .map_err(|e| LauncherError::fs("write backup", staging.path(), e))?;
        let archive = staging.persist()?;
        info!("Backup created successfully");

        if let Err(e) = self.rotate() {
            warn!("Failed to rotate backups: {e}");
        }
        Ok(Some(archive))
    }

    fn write_archive(&self, target: &Path, worlds: &[&str]) -> io::Result<()> {
        let file = File::create(target)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let dir_options = SimpleFileOptions::default();
        let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated).large_file(true);

        for world in worlds {
            for entry in WalkDir::new(self.work_dir.join(world)).follow_links(false) {
                let entry = entry?;
                if entry.file_name() == SESSION_LOCK {
                    continue;
                }

                let relative = entry.path().strip_prefix(&self.work_dir).map_err(io::Error::other)?;
                let name = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");

                if entry.file_type().is_dir() {
                    zip.add_directory(format!("{name}/"), dir_options).map_err(io::Error::other)?;
                } else if entry.file_type().is_file() {
                    zip.start_file(name, file_options).map_err(io::Error::other)?;
                    let mut source = File::open(entry.path())?;
                    io::copy(&mut source, &mut zip)?;
                }
            }
            debug!("Added {world} to backup");
        }

        let mut writer = zip.finish().map_err(io::Error::other)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    /// Deletes the oldest archives beyond the retention count. Returns how many were deleted.
    pub fn rotate(&self) -> Result<usize, LauncherError> {
        let entries = std::fs::read_dir(&self.backup_dir)
            .map_err(|e| LauncherError::fs("read directory", &self.backup_dir, e))?;

        // Timestamped names sort chronologically.
        let mut backups: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(BACKUP_EXTENSION))
            })
            .collect();
        if backups.len() <= self.retention {
            return Ok(0);
        }
        backups.sort();

        let excess = backups.len() - self.retention;
        for old in &backups[..excess] {
            info!("Deleting old backup: {}", old.display());
            std::fs::remove_file(old).map_err(|e| LauncherError::fs("delete backup", old, e))?;
        }
        Ok(excess)
    }
}
