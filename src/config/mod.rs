//! Launcher configuration (`config.yaml`)
//!
//! The configuration file lives next to the launcher (path selectable with
//! `-c`). When it does not exist it is created from [`DEFAULT_CONFIG`], a
//! commented template, so first-time users have something to edit.
//!
//! # Resolution order
//!
//! 1. Values in `config.yaml` (missing keys take serde defaults)
//! 2. Environment overrides: `MINECRAFT_VERSION`, `WORK_DIR`, `JAVA_PATH`,
//!    `LOG_FILE`, `MIN_RAM`, `MAX_RAM`, and the first non-empty of
//!    `LAUNCHER_GITHUB_TOKEN`, `GITHUB_TOKEN`, `GH_TOKEN`
//! 3. Command-line flags, applied by the CLI layer
//!
//! [`LauncherConfig::validate`] runs after all three.

pub mod network;

pub use network::NetworkConfig;

use crate::core::LauncherError;
use crate::utils::fs::atomic_write;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Largest heap, in GB, the launcher will ever configure.
pub const MAX_SAFE_RAM_GB: u32 = 128;

/// Environment variables consulted for the release-feed token, in priority order.
pub const TOKEN_ENV_VARS: [&str; 3] = ["LAUNCHER_GITHUB_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"];

/// Template written when no configuration file exists.
pub const DEFAULT_CONFIG: &str = r#"# Paper server launcher configuration
# This file is created automatically on first run.

# Minecraft version to run ("latest" or e.g. "1.21.4")
minecraft_version: "latest"

# Check for a newer Paper build of the same version on every start
auto_update: true

# Let the launcher update itself from its release feed
auto_update_launcher: true

# Token for the launcher's release feed
# - required when the repository is private (GitHub answers 404 without one)
# - prefer the LAUNCHER_GITHUB_TOKEN environment variable over storing it here
github_token: ""

# Back up world directories before starting the server
auto_backup: false

# Number of backup archives to keep (oldest are deleted first)
backup_count: 10

# Directory backup archives are written to
backup_dir: "backups"

# World directories to include in backups
backup_worlds:
  - world
  - world_nether
  - world_the_end

# Minimum heap size in GB
min_ram: 2

# Maximum heap size in GB
# 0 computes it from system memory and auto_ram_percentage
max_ram: 0

# Use ZGC instead of G1 (lower pause times on large heaps, needs Java 11+)
use_zgc: false

# Share of system memory used when max_ram is 0 (percent)
auto_ram_percentage: 50

# Extra arguments passed to the server after the JAR
server_args:
  - nogui

# Also write launcher logs to a file
log_file_enable: false
"#;

/// Settings read from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default = "default_minecraft_version")]
    pub minecraft_version: String,

    #[serde(default = "default_true")]
    pub auto_update: bool,

    #[serde(default = "default_true")]
    pub auto_update_launcher: bool,

    #[serde(default)]
    pub github_token: String,

    #[serde(default)]
    pub auto_backup: bool,

    #[serde(default = "default_backup_count")]
    pub backup_count: usize,

    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    #[serde(default = "default_backup_worlds")]
    pub backup_worlds: Vec<String>,

    /// Minimum heap in GB.
    #[serde(default = "default_min_ram")]
    pub min_ram: u32,

    /// Maximum heap in GB; 0 means "compute from system memory".
    #[serde(default)]
    pub max_ram: u32,

    #[serde(default)]
    pub use_zgc: bool,

    #[serde(default = "default_auto_ram_percentage")]
    pub auto_ram_percentage: u32,

    #[serde(default = "default_server_args")]
    pub server_args: Vec<String>,

    /// Server directory; empty means the current directory.
    #[serde(default)]
    pub work_dir: String,

    /// Java executable; empty means `java` from `PATH`.
    #[serde(default)]
    pub java_path: String,

    #[serde(default)]
    pub log_file_enable: bool,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            minecraft_version: default_minecraft_version(),
            auto_update: true,
            auto_update_launcher: true,
            github_token: String::new(),
            auto_backup: false,
            backup_count: default_backup_count(),
            backup_dir: default_backup_dir(),
            backup_worlds: default_backup_worlds(),
            min_ram: default_min_ram(),
            max_ram: 0,
            use_zgc: false,
            auto_ram_percentage: default_auto_ram_percentage(),
            server_args: default_server_args(),
            work_dir: String::new(),
            java_path: String::new(),
            log_file_enable: false,
            log_file: default_log_file(),
            network: NetworkConfig::default(),
        }
    }
}

fn default_minecraft_version() -> String {
    "latest".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_backup_count() -> usize {
    10
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

fn default_backup_worlds() -> Vec<String> {
    vec!["world".to_string(), "world_nether".to_string(), "world_the_end".to_string()]
}

const fn default_min_ram() -> u32 {
    2
}

const fn default_auto_ram_percentage() -> u32 {
    50
}

fn default_server_args() -> Vec<String> {
    vec!["nogui".to_string()]
}

fn default_log_file() -> String {
    "launcher.log".to_string()
}

impl LauncherConfig {
    /// Loads `path` with overrides from the process environment.
    pub fn load(path: &Path) -> Result<Self, LauncherError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Loads `path`, creating it from [`DEFAULT_CONFIG`] if missing, and
    /// applies overrides from `env`.
    pub fn load_with_env<F>(path: &Path, env: F) -> Result<Self, LauncherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !path.exists() {
            atomic_write(path, DEFAULT_CONFIG.as_bytes())
                .map_err(|e| LauncherError::fs("create config", path, e))?;
            info!("Created {} with default settings", path.display());
        }

        let data = std::fs::read_to_string(path).map_err(|e| LauncherError::fs("read config", path, e))?;
        let mut config = Self::parse(&data)?;
        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    /// Parses YAML text, treating an empty document as all defaults.
    pub fn parse(data: &str) -> Result<Self, LauncherError> {
        let mut config: Self = if data.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(data).map_err(|e| LauncherError::Config {
                message: format!("failed to parse config: {e}"),
            })?
        };
        config.fill_blank_defaults();
        Ok(config)
    }

    /// Zero or blank values that have no meaning of their own fall back to defaults.
    fn fill_blank_defaults(&mut self) {
        if self.auto_ram_percentage == 0 {
            self.auto_ram_percentage = default_auto_ram_percentage();
        }
        if self.backup_worlds.is_empty() {
            self.backup_worlds = default_backup_worlds();
        }
        if self.backup_count == 0 {
            self.backup_count = default_backup_count();
        }
        if self.backup_dir.trim().is_empty() {
            self.backup_dir = default_backup_dir();
        }
        if self.log_file.trim().is_empty() {
            self.log_file = default_log_file();
        }
    }

    /// Applies environment overrides read through `env`.
    ///
    /// Unparseable RAM values are logged and ignored.
    pub fn apply_env_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());

        if let Some(v) = non_empty("MINECRAFT_VERSION") {
            self.minecraft_version = v;
        }
        if let Some(v) = non_empty("WORK_DIR") {
            self.work_dir = v;
        }
        if let Some(v) = non_empty("JAVA_PATH") {
            self.java_path = v;
        }
        if let Some(v) = non_empty("LOG_FILE") {
            self.log_file = v;
        }
        if let Some(token) = TOKEN_ENV_VARS.iter().find_map(|key| non_empty(*key)) {
            self.github_token = token;
        }
        if let Some(v) = non_empty("MIN_RAM") {
            match v.trim().parse::<u32>() {
                Ok(min) if min > 0 => self.min_ram = min,
                _ => warn!("Ignoring MIN_RAM={v:?}: expected a positive integer"),
            }
        }
        if let Some(v) = non_empty("MAX_RAM") {
            match v.trim().parse::<u32>() {
                Ok(max) => self.max_ram = max,
                Err(_) => warn!("Ignoring MAX_RAM={v:?}: expected a non-negative integer"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), LauncherError> {
        let fail = |message: String| Err(LauncherError::Config {
            message,
        });

        if self.minecraft_version.trim().is_empty() {
            return fail("minecraft_version cannot be empty".to_string());
        }
        if self.min_ram == 0 {
            return fail("min_ram must be greater than 0".to_string());
        }
        if self.max_ram != 0 && self.min_ram > self.max_ram {
            return fail("min_ram cannot be greater than max_ram".to_string());
        }
        if self.max_ram > MAX_SAFE_RAM_GB {
            return fail(format!("max_ram exceeds safety limit ({MAX_SAFE_RAM_GB}GB)"));
        }
        if !(10..=95).contains(&self.auto_ram_percentage) {
            return fail("auto_ram_percentage must be between 10 and 95".to_string());
        }
        if self.backup_count < 1 {
            return fail("backup_count must be at least 1".to_string());
        }
        self.network.validate().or_else(fail)
    }

    /// Server directory: `work_dir` if set, else the current directory.
    #[must_use]
    pub fn work_dir_path(&self) -> PathBuf {
        if self.work_dir.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.work_dir)
        }
    }

    /// Token for the release feed, if one is configured.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        let token = self.github_token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}
