//! Java runtime detection.

use crate::core::LauncherError;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Oldest Java major version Paper runs on.
pub const MIN_JAVA_VERSION: u32 = 17;

/// Default command used when no `java_path` is configured.
pub const JAVA_COMMAND: &str = "java";

/// A Java runtime that passed [`check_java`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaRuntime {
    /// Executable that was probed.
    pub path: PathBuf,
    /// Version string as printed by `java -version`, e.g. `21.0.2` or `1.8.0_392`.
    pub version: String,
    /// Major version, with the legacy `1.x` scheme folded (`1.8` is 8).
    pub major: u32,
}

/// Pulls the version string out of `java -version` output.
///
/// Prefers the quoted token on the first line mentioning `version`, and
/// falls back to the first whitespace-separated token starting with a digit.
#[must_use]
pub fn extract_java_version(output: &str) -> Option<String> {
    for line in output.lines().map(str::trim) {
        if !line.to_ascii_lowercase().contains("version") {
            continue;
        }

        if let Some(start) = line.find('"') {
            if let Some(len) = line[start + 1..].find('"') {
                return Some(line[start + 1..start + 1 + len].to_string());
            }
        }

        let token = line
            .split_whitespace()
            .map(|part| part.trim_matches('"'))
            .find(|part| part.starts_with(|c: char| matches!(c, '1'..='9')));
        if let Some(token) = token {
            return Some(token.to_string());
        }
    }
    None
}

/// Major version of a Java version string.
///
/// `"17.0.9"` is 17, `"1.8.0_392"` is 8, `"21-ea"` is 21.
#[must_use]
pub fn parse_java_major(version: &str) -> Option<u32> {
    let mut parts = version.trim().split('.');
    let first = parts.next()?;
    let major = match (first, parts.next()) {
        ("1", Some(second)) => second,
        _ => first,
    };

    let digits: String = major
        .trim_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok().filter(|major| *major > 0)
}

fn resolve_java(java_path: Option<&str>) -> PathBuf {
    let command = java_path.map(str::trim).filter(|p| !p.is_empty()).unwrap_or(JAVA_COMMAND);
    which::which(command).unwrap_or_else(|_| PathBuf::from(command))
}

/// Runs `java -version` and checks the runtime is at least [`MIN_JAVA_VERSION`].
pub async fn check_java(java_path: Option<&str>) -> Result<JavaRuntime, LauncherError> {
    let path = resolve_java(java_path);
    debug!("Probing Java at {}", path.display());

    let output = Command::new(&path).arg("-version").output().await.map_err(|e| LauncherError::Java {
        message: format!("Java is not installed or not found at {}: {e}", path.display()),
    })?;

    // `java -version` prints to stderr; some builds use stdout.
    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));

    if !output.status.success() {
        return Err(LauncherError::Java {
            message: format!("{} -version exited with {}", path.display(), output.status),
        });
    }

    let version = extract_java_version(&text).ok_or_else(|| LauncherError::Java {
        message: "failed to parse Java version from output".to_string(),
    })?;
    let major = parse_java_major(&version).ok_or_else(|| LauncherError::Java {
        message: format!("failed to parse Java version: {version}"),
    })?;

    if major < MIN_JAVA_VERSION {
        return Err(LauncherError::Java {
            message: format!("Java {MIN_JAVA_VERSION} or higher is required, found Java {major}"),
        });
    }

    Ok(JavaRuntime {
        path,
        version,
        major,
    })
}
