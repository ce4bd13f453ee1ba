//! Acquisition and verification of the managed server JAR.
//!
//! Server JARs live in the working directory under their upstream file name,
//! `paper-<version>-<build>.jar`, next to a `<jar>.sha256` sidecar. A JAR
//! with a sidecar that matches is trusted; one without a sidecar is
//! structurally validated once and then gets a sidecar.

use crate::artifact::validate_and_checksum;
use crate::checksum::ChecksumStore;
use crate::constants::{PART_SUFFIX, STAGED_SUFFIX};
use crate::context::LaunchContext;
use crate::core::LauncherError;
use crate::upgrade::BackupManager;
use crate::upstream::BuildDescriptor;
use crate::utils::fs::{remove_if_exists, replace_file, with_suffix};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static JAR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^paper-(.+)-(\d+)\.jar$").unwrap_or_else(|e| panic!("invalid JAR name pattern: {e}"))
});

const STAGED_JAR_SUFFIX: &str = ".jar.new";

/// Splits `paper-<version>-<build>.jar` into its version and build.
#[must_use]
pub fn parse_jar_name(file_name: &str) -> Option<(String, u32)> {
    let captures = JAR_NAME.captures(file_name)?;
    let build = captures[2].parse().ok()?;
    Some((captures[1].to_string(), build))
}

fn jar_build(path: &Path) -> Option<(String, u32)> {
    path.file_name().and_then(|name| name.to_str()).and_then(parse_jar_name)
}

/// Finds the server JAR with the highest build number in `dir`.
///
/// Only regular files named like an upstream JAR count, so `.part` and
/// `.old` leftovers are never picked.
pub fn find_jar_file(dir: &Path) -> Result<Option<PathBuf>, LauncherError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LauncherError::fs("read directory", dir, e))?;

    let mut best: Option<(u32, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| LauncherError::fs("read directory", dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some((_, build)) = jar_build(&path) else {
            continue;
        };
        if best.as_ref().is_none_or(|(best_build, _)| build > *best_build) {
            best = Some((build, path));
        }
    }

    Ok(best.map(|(_, path)| path))
}

/// Deletes `.part` files and staged `.jar.new` files left in `dir` by an interrupted download.
///
/// Partial downloads are never resumed. Returns how many were removed.
pub fn discard_stale_partials(dir: &Path) -> Result<usize, LauncherError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LauncherError::fs("read directory", dir, e))?;

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let leftover = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(PART_SUFFIX) || n.ends_with(STAGED_JAR_SUFFIX));
        if leftover && path.is_file() {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed interrupted download {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove interrupted download {}: {e}", path.display()),
            }
        }
    }
    Ok(removed)
}

/// What [`verify_existing`] established about a JAR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JarVerification {
    /// The sidecar digest matches the file.
    Verified,
    /// There was no usable sidecar; the JAR passed validation and one was written.
    ChecksumSaved {
        digest: String,
    },
    /// There was no usable sidecar and the JAR did not pass validation.
    Unverified {
        reason: String,
    },
}

/// Checks an existing JAR against its sidecar.
///
/// A checksum mismatch is returned as [`LauncherError::ChecksumMismatch`] so
/// the caller can decide whether to re-download. A malformed sidecar is
/// treated as missing.
pub fn verify_existing(jar: &Path) -> Result<JarVerification, LauncherError> {
    let sidecar = ChecksumStore::sidecar_path(jar);
    let expected = match ChecksumStore::load(&sidecar) {
        Ok(expected) => expected,
        Err(e) => {
            warn!("Ignoring checksum file: {e}");
            None
        }
    };

    if let Some(expected) = expected {
        ChecksumStore::verify(jar, &expected)?;
        info!("Validated existing JAR file checksum");
        return Ok(JarVerification::Verified);
    }

    match validate_and_checksum(jar) {
        Ok((_, digest)) => {
            ChecksumStore::save(&sidecar, &digest)?;
            info!("Calculated and saved checksum for existing JAR");
            Ok(JarVerification::ChecksumSaved {
                digest,
            })
        }
        Err(e) => {
            warn!("Existing JAR validation failed: {e}");
            Ok(JarVerification::Unverified {
                reason: e.to_string(),
            })
        }
    }
}

fn sidecar_matches(jar: &Path) -> bool {
    let sidecar = ChecksumStore::sidecar_path(jar);
    match ChecksumStore::load(&sidecar) {
        Ok(Some(expected)) => match ChecksumStore::verify(jar, &expected) {
            Ok(()) => true,
            Err(e) => {
                info!("{e}; downloading again");
                false
            }
        },
        Ok(None) => {
            info!("No checksum file for {}; downloading again to ensure integrity", jar.display());
            false
        }
        Err(e) => {
            warn!("{e}; downloading again");
            false
        }
    }
}

/// Downloads the build described by `build` into `dir`, unless a verified copy is already there.
///
/// The download lands at `<jar>.new` and is structurally validated and
/// checksummed in one pass before it replaces `<jar>`. A download that fails
/// validation is deleted and the existing JAR is left as it was.
pub async fn acquire_build(
    ctx: &LaunchContext,
    dir: &Path,
    build: &BuildDescriptor,
) -> Result<PathBuf, LauncherError> {
    let jar = dir.join(&build.file_name);

    if jar.is_file() {
        info!("JAR file already exists: {}", jar.display());
        if sidecar_matches(&jar) {
            info!("Existing JAR file checksum validated");
            return Ok(jar);
        }
    }

    info!("Downloading {} (build {})...", build.file_name, build.build);
    let staged = with_suffix(&jar, STAGED_SUFFIX);
    ctx.fetcher.fetch(&build.url, &staged, &ctx.cancel).await?;

    let digest = match validate_and_checksum(&staged) {
        Ok((report, digest)) => {
            debug!("{} holds {} entries ({} bytes)", staged.display(), report.entries, report.size);
            digest
        }
        Err(e) => {
            discard_staged(&staged);
            return Err(e);
        }
    };

    let sidecar = ChecksumStore::sidecar_path(&jar);
    let promoted = remove_if_exists(&sidecar)
        .map_err(|e| LauncherError::fs("remove", &sidecar, e))
        .and_then(|_| replace_file(&staged, &jar).map_err(|e| LauncherError::fs("replace", &jar, e)));
    if let Err(e) = promoted {
        discard_staged(&staged);
        return Err(e);
    }

    ChecksumStore::save(&sidecar, &digest)?;
    info!("Downloaded and validated JAR file (SHA-256: {}...)", &digest[..16]);
    Ok(jar)
}

fn discard_staged(staged: &Path) {
    if let Err(e) = remove_if_exists(staged) {
        warn!("Failed to remove {}: {e}", staged.display());
    }
}

/// Resolves `version` (or `"latest"`) against the build feed and acquires its newest build.
pub async fn download_jar(ctx: &LaunchContext, dir: &Path, version: &str) -> Result<PathBuf, LauncherError> {
    let build = ctx.build_feed().resolve(version, &ctx.cancel).await?;
    acquire_build(ctx, dir, &build).await
}

/// Returns the newest upstream build of the JAR's own version when it is newer than the JAR.
pub async fn check_update(ctx: &LaunchContext, jar: &Path) -> Result<Option<BuildDescriptor>, LauncherError> {
    let (version, current) = jar_build(jar).ok_or_else(|| LauncherError::UnrecognizedJarName {
        path: jar.to_path_buf(),
    })?;

    let feed = ctx.build_feed();
    let latest = feed.latest_build(&version, &ctx.cancel).await?;
    if latest <= current {
        debug!("{} is the newest build of {version}", jar.display());
        return Ok(None);
    }

    let file_name = feed.download_name(&version, latest, &ctx.cancel).await?;
    let url = feed.download_url(&version, latest, &file_name);
    Ok(Some(BuildDescriptor {
        version,
        build: latest,
        file_name,
        url,
    }))
}

/// Replaces `jar` with the newer `build`.
///
/// The current JAR is moved to `<jar>.old` first and renamed back if the
/// download fails. On success the backup and the old sidecar are removed.
pub async fn update_jar(ctx: &LaunchContext, jar: &Path, build: &BuildDescriptor) -> Result<PathBuf, LauncherError> {
    let dir = jar.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let backup = BackupManager::new(jar);
    backup.move_aside()?;

    let downloaded = match acquire_build(ctx, &dir, build).await {
        Ok(path) => path,
        Err(e) => {
            match backup.restore_backup() {
                Ok(()) => info!("Restored original JAR file"),
                Err(restore_error) => warn!(
                    "Failed to restore {} from {}: {restore_error}",
                    jar.display(),
                    backup.backup_path().display()
                ),
            }
            return Err(e);
        }
    };

    if let Err(e) = backup.cleanup_backup() {
        warn!("Failed to remove {}: {e}", backup.backup_path().display());
    }
    if let Err(e) = remove_if_exists(&ChecksumStore::sidecar_path(jar)) {
        warn!("Failed to remove old checksum file: {e}");
    }

    info!("Updated to: {}", downloaded.display());
    Ok(downloaded)
}
