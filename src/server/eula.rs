//! Minecraft EULA acceptance file.

use crate::core::LauncherError;
use crate::utils::fs::atomic_write;
use std::path::Path;
use tracing::info;

pub const EULA_FILE: &str = "eula.txt";

const EULA_CONTENT: &str = "# By changing the setting below to TRUE you are indicating your agreement to our EULA (https://aka.ms/MinecraftEULA).\neula=true\n";

fn accepts(content: &str) -> bool {
    content.lines().map(str::trim).any(|line| line.eq_ignore_ascii_case("eula=true"))
}

/// Writes `eula.txt` with `eula=true` unless the file in `dir` already accepts.
///
/// Returns `true` if the file was written.
pub fn ensure_eula(dir: &Path) -> Result<bool, LauncherError> {
    let path = dir.join(EULA_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) if accepts(&content) => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(LauncherError::fs("read", &path, e)),
    }

    atomic_write(&path, EULA_CONTENT.as_bytes()).map_err(|e| LauncherError::fs("write", &path, e))?;
    info!("Accepted the Minecraft EULA in {}", path.display());
    Ok(true)
}
