//! Structural validation of downloaded archives.
//!
//! A server JAR is a ZIP container. Validation here answers "is this a
//! well-formed container at all" by inspecting bytes already on disk, which
//! catches truncated and corrupted downloads. Whether the bytes are the
//! *expected* ones is the checksum store's job; after a fresh download both
//! checks run over a single open of the file via [`validate_and_checksum`].
//!
//! Checks run in order and stop at the first failure:
//!
//! 1. the path exists and is a regular file
//! 2. the file is not empty
//! 3. the file is at least [`MIN_ARCHIVE_SIZE`] bytes
//! 4. it starts with the `PK` signature
//! 5. the central directory parses
//! 6. the archive has at least one entry
//!
//! A missing `META-INF/MANIFEST.MF` is logged as a warning only.

use crate::checksum::ChecksumStore;
use crate::core::{LauncherError, StructureError};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

/// Size of an empty ZIP archive (a lone end-of-central-directory record).
pub const MIN_ARCHIVE_SIZE: u64 = 22;

/// Leading signature of every ZIP local file header.
pub const ARCHIVE_MAGIC: &[u8; 2] = b"PK";

/// Manifest entry every runnable JAR is expected to carry.
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// What a successful structural check found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureReport {
    pub size: u64,
    pub entries: usize,
    pub has_manifest: bool,
}

fn structure_error(path: &Path, kind: StructureError) -> LauncherError {
    LauncherError::Structure {
        path: path.to_path_buf(),
        kind,
    }
}

fn open_regular_file(path: &Path) -> Result<(File, u64), LauncherError> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(structure_error(path, StructureError::NotFound));
        }
        Err(e) => return Err(LauncherError::fs("inspect", path, e)),
    };
    if metadata.is_dir() {
        return Err(structure_error(path, StructureError::IsDirectory));
    }

    let file = File::open(path).map_err(|e| LauncherError::fs("open", path, e))?;
    Ok((file, metadata.len()))
}

fn inspect(file: &mut File, size: u64, path: &Path) -> Result<StructureReport, LauncherError> {
    if size == 0 {
        return Err(structure_error(path, StructureError::Empty));
    }
    if size < MIN_ARCHIVE_SIZE {
        return Err(structure_error(
            path,
            StructureError::TooSmall {
                size,
                minimum: MIN_ARCHIVE_SIZE,
            },
        ));
    }

    let mut magic = [0u8; 2];
    file.read_exact(&mut magic).map_err(|e| LauncherError::fs("read", path, e))?;
    if &magic != ARCHIVE_MAGIC {
        return Err(structure_error(
            path,
            StructureError::BadMagic {
                expected: String::from_utf8_lossy(ARCHIVE_MAGIC).into_owned(),
                found: hex::encode(magic),
            },
        ));
    }
    file.seek(SeekFrom::Start(0)).map_err(|e| LauncherError::fs("seek", path, e))?;

    let archive = zip::ZipArchive::new(&mut *file).map_err(|e| {
        structure_error(
            path,
            StructureError::CorruptContainer {
                reason: e.to_string(),
            },
        )
    })?;

    let entries = archive.len();
    if entries == 0 {
        return Err(structure_error(path, StructureError::NoEntries));
    }

    let has_manifest = archive.file_names().any(|name| name == MANIFEST_ENTRY);
    if !has_manifest {
        warn!("{} has no {MANIFEST_ENTRY}; the server may fail to start", path.display());
    }

    debug!("{} is a valid archive with {entries} entries", path.display());
    Ok(StructureReport {
        size,
        entries,
        has_manifest,
    })
}

/// Checks that `path` is a well-formed, non-empty archive.
pub fn validate_structure(path: &Path) -> Result<StructureReport, LauncherError> {
    let (mut file, size) = open_regular_file(path)?;
    inspect(&mut file, size, path)
}

/// Validates structure and computes the SHA-256 digest from one open of the file.
pub fn validate_and_checksum(path: &Path) -> Result<(StructureReport, String), LauncherError> {
    let (mut file, size) = open_regular_file(path)?;
    let report = inspect(&mut file, size, path)?;

    file.seek(SeekFrom::Start(0)).map_err(|e| LauncherError::fs("seek", path, e))?;
    let digest =
        ChecksumStore::compute_reader(&mut file).map_err(|e| LauncherError::fs("read", path, e))?;
    Ok((report, digest))
}
