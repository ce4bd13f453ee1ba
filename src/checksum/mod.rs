//! SHA-256 checksums and their on-disk sidecar files.
//!
//! Hashing a multi-hundred-megabyte server JAR on every launch is slow, so the
//! digest computed after a verified download is cached in `<artifact>.sha256`.
//! The sidecar is advisory: a missing one means "first-time download", and a
//! malformed one is reported so the caller can discard it and recompute.
//!
//! # Sidecar format
//!
//! Exactly 64 ASCII hex characters, nothing else. Surrounding whitespace is
//! trimmed on read; comparison is case-insensitive.

use crate::constants::{CHECKSUM_BUFFER_SIZE, SIDECAR_SUFFIX};
use crate::core::LauncherError;
use crate::utils::fs::{atomic_write, with_suffix};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static HEX_DIGEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[0-9a-fA-F]{64}$").unwrap_or_else(|e| panic!("invalid digest pattern: {e}"))
});

/// Checksum computation and sidecar persistence.
pub struct ChecksumStore;

impl ChecksumStore {
    /// Path of the sidecar that belongs to `artifact`.
    #[must_use]
    pub fn sidecar_path(artifact: &Path) -> PathBuf {
        with_suffix(artifact, SIDECAR_SUFFIX)
    }

    /// Streams `path` through SHA-256 and returns the lowercase hex digest.
    pub fn compute(path: &Path) -> Result<String, LauncherError> {
        debug!("Computing SHA-256 for {}", path.display());
        let mut file = File::open(path).map_err(|e| LauncherError::fs("open", path, e))?;
        Self::compute_reader(&mut file).map_err(|e| LauncherError::fs("read", path, e))
    }

    /// Hashes everything readable from `reader` using a bounded buffer.
    pub fn compute_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; CHECKSUM_BUFFER_SIZE];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..read]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Writes `digest` to `sidecar`, replacing any existing sidecar.
    pub fn save(sidecar: &Path, digest: &str) -> Result<(), LauncherError> {
        atomic_write(sidecar, digest.as_bytes()).map_err(|e| LauncherError::fs("write", sidecar, e))
    }

    /// Reads a sidecar.
    ///
    /// Returns `Ok(None)` when the sidecar does not exist and
    /// [`LauncherError::MalformedDigest`] when its content is not a digest.
    pub fn load(sidecar: &Path) -> Result<Option<String>, LauncherError> {
        let raw = match std::fs::read_to_string(sidecar) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(LauncherError::MalformedDigest {
                    path: sidecar.to_path_buf(),
                    reason: "file is not valid UTF-8".to_string(),
                });
            }
            Err(e) => return Err(LauncherError::fs("read", sidecar, e)),
        };

        let digest = raw.trim();
        if digest.len() != 64 {
            return Err(LauncherError::MalformedDigest {
                path: sidecar.to_path_buf(),
                reason: format!("expected 64 characters, found {}", digest.len()),
            });
        }
        if !HEX_DIGEST.is_match(digest) {
            return Err(LauncherError::MalformedDigest {
                path: sidecar.to_path_buf(),
                reason: "contains non-hexadecimal characters".to_string(),
            });
        }
        Ok(Some(digest.to_string()))
    }

    /// Checks `path` against `expected`.
    ///
    /// An empty `expected` means there is no baseline and always succeeds
    /// without hashing.
    pub fn verify(path: &Path, expected: &str) -> Result<(), LauncherError> {
        let expected = expected.trim();
        if expected.is_empty() {
            return Ok(());
        }

        let actual = Self::compute(path)?;
        if actual.eq_ignore_ascii_case(expected) {
            debug!("Checksum verified for {}", path.display());
            Ok(())
        } else {
            Err(LauncherError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: expected.to_ascii_lowercase(),
                actual,
            })
        }
    }
}
