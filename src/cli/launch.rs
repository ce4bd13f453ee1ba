//! The launch sequence.
//!
//! 1. Self-update. An installed update ends the run so the new executable
//!    is used on the next start.
//! 2. System memory and the Java runtime are probed concurrently.
//! 3. `eula.txt` is accepted.
//! 4. The server JAR is found (or downloaded), verified against its
//!    checksum sidecar, and updated to the newest build of its version.
//! 5. Worlds are backed up when enabled.
//! 6. The server runs until it exits or the launcher is cancelled.

use super::prompt;
use crate::checksum::ChecksumStore;
use crate::config::LauncherConfig;
use crate::context::LaunchContext;
use crate::core::LauncherError;
use crate::server::{
    JarVerification, ServerLaunch, calculate_max_ram, check_java, check_update, discard_stale_partials, download_jar,
    ensure_eula, find_jar_file, query_system_memory, update_jar, verify_existing,
};
use crate::upgrade::{SelfUpdater, UpdateOutcome};
use crate::utils::fs::{ensure_dir, remove_if_exists};
use crate::world_backup::WorldBackup;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How a launch ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The launcher replaced itself and must be started again.
    LauncherUpdated {
        version: String,
    },
    /// The server ran and exited cleanly.
    ServerStopped,
}

pub struct Launcher {
    config: LauncherConfig,
    ctx: LaunchContext,
    work_dir: PathBuf,
}

impl Launcher {
    pub fn new(config: LauncherConfig, ctx: LaunchContext) -> Self {
        let work_dir = config.work_dir_path();
        Self {
            config,
            ctx,
            work_dir,
        }
    }

    fn ensure_not_cancelled(&self) -> Result<(), LauncherError> {
        if self.ctx.cancel.is_cancelled() {
            return Err(LauncherError::Cancelled);
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<LaunchOutcome> {
        info!("Launcher started");
        info!("Launcher version: {}", self.ctx.current_version);

        if let Some(version) = self.self_update().await? {
            println!("{}", format!("Launcher updated to {version}. Please restart the launcher.").green().bold());
            return Ok(LaunchOutcome::LauncherUpdated {
                version,
            });
        }
        self.ensure_not_cancelled()?;

        ensure_dir(&self.work_dir).map_err(|e| LauncherError::fs("create directory", &self.work_dir, e))?;
        info!("Working directory: {}", self.work_dir.display());
        let removed = discard_stale_partials(&self.work_dir)?;
        if removed > 0 {
            info!("Removed {removed} interrupted download(s)");
        }

        let java_path = Some(self.config.java_path.as_str()).filter(|p| !p.trim().is_empty());
        let (memory, java) = tokio::join!(query_system_memory(), check_java(java_path));
        match memory {
            Some(memory) => {
                info!("System RAM: {} GB total, {} GB available", memory.total_gb, memory.available_gb);
            }
            None => warn!("Failed to get system RAM info"),
        }
        let java = java?;
        info!("Java version: {}", java.version);

        if ensure_eula(&self.work_dir)? {
            debug!("eula.txt written");
        }

        let jar = self.prepare_jar().await?;
        self.ensure_not_cancelled()?;

        let max_ram = calculate_max_ram(self.config.max_ram, self.config.auto_ram_percentage, self.config.min_ram, memory);

        if self.config.auto_backup {
            let backup = WorldBackup::from_config(&self.config, &self.work_dir);
            tokio::task::spawn_blocking(move || backup.run())
                .await
                .context("Backup task panicked")?
                .context("Backup failed")?;
        }
        self.ensure_not_cancelled()?;

        if self.config.max_ram == 0 {
            info!(
                "Starting server with {}G - {max_ram}G RAM (auto-calculated: {}% of available RAM)",
                self.config.min_ram, self.config.auto_ram_percentage
            );
        } else {
            info!("Starting server with {}G - {max_ram}G RAM", self.config.min_ram);
        }

        let launch = ServerLaunch {
            java: java.path,
            java_major: java.major,
            jar: jar.file_name().map_or_else(|| jar.clone(), PathBuf::from),
            work_dir: self.work_dir.clone(),
            min_ram_gb: self.config.min_ram,
            max_ram_gb: max_ram,
            use_zgc: self.config.use_zgc,
            server_args: self.config.server_args.clone(),
        };

        let status = launch.run(&self.ctx.cancel).await?;
        if !status.success() {
            bail!("Server stopped with {status}");
        }
        info!("Server stopped");
        Ok(LaunchOutcome::ServerStopped)
    }

    /// Prompts the user; cancellation ends the wait.
    async fn ask(&self, question: &str) -> Result<bool, LauncherError> {
        tokio::select! {
            () = self.ctx.cancel.cancelled() => Err(LauncherError::Cancelled),
            answer = prompt::confirm_async(question) => Ok(answer),
        }
    }

    /// Runs the self-update sequence. Returns the new version if one was installed.
    async fn self_update(&self) -> Result<Option<String>, LauncherError> {
        let updater = match SelfUpdater::new(&self.ctx) {
            Ok(updater) => updater,
            Err(e) => {
                warn!("Skipping launcher update check: {e}");
                return Ok(None);
            }
        };
        let mut updater = updater.auto_install(self.config.auto_update_launcher);

        let outcome = updater
            .run(|update| {
                prompt::confirm_async(format!("Do you want to update the launcher to {}?", update.release.tag))
            })
            .await?;

        match outcome {
            UpdateOutcome::Installed {
                version,
            } => Ok(Some(version)),
            UpdateOutcome::NoUpdate(reason) => {
                debug!("No launcher update: {reason:?}");
                Ok(None)
            }
            UpdateOutcome::Declined {
                ..
            } => Ok(None),
            UpdateOutcome::Failed {
                error,
            } => {
                warn!("Launcher update failed, continuing with the current version: {error}");
                Ok(None)
            }
        }
    }

    /// Finds, verifies, and updates the server JAR, downloading it if there is none.
    async fn prepare_jar(&self) -> Result<PathBuf> {
        let Some(jar) = find_jar_file(&self.work_dir)? else {
            if !self.ask("No Paper JAR file found. Download automatically?").await? {
                bail!("Cannot start the server without a JAR file");
            }
            let jar = download_jar(&self.ctx, &self.work_dir, &self.config.minecraft_version).await?;
            info!("Downloaded JAR file: {}", jar.display());
            return Ok(jar);
        };
        info!("Found JAR file: {}", jar.display());

        match verify_existing(&jar) {
            Ok(JarVerification::Verified | JarVerification::ChecksumSaved { .. }) => {}
            Ok(JarVerification::Unverified {
                reason,
            }) => warn!("Could not verify {}: {reason}", jar.display()),
            Err(e @ LauncherError::ChecksumMismatch { .. }) => {
                warn!("Existing JAR failed checksum validation: {e}");
                if self.ask("JAR file checksum validation failed. Re-download?").await? {
                    return self.redownload(&jar).await;
                }
                warn!("Continuing with invalid JAR file (not recommended)");
            }
            Err(e) => return Err(e.into()),
        }

        match check_update(&self.ctx, &jar).await {
            Ok(Some(build)) => {
                info!("New version available: {} (build {})", build.file_name, build.build);
                if self.config.auto_update || self.ask("Do you want to update?").await? {
                    info!("Updating server JAR...");
                    let updated = update_jar(&self.ctx, &jar, &build).await.context("Failed to update the server JAR")?;
                    return Ok(updated);
                }
            }
            Ok(None) => debug!("Server JAR is up to date"),
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => warn!("Failed to check for server updates: {e}"),
        }

        Ok(jar)
    }

    async fn redownload(&self, corrupt: &Path) -> Result<PathBuf> {
        let jar = download_jar(&self.ctx, &self.work_dir, &self.config.minecraft_version)
            .await
            .context("Failed to re-download the server JAR")?;

        if jar != corrupt {
            for stale in [corrupt.to_path_buf(), ChecksumStore::sidecar_path(corrupt)] {
                if let Err(e) = remove_if_exists(&stale) {
                    warn!("Failed to remove {}: {e}", stale.display());
                }
            }
        }
        info!("Re-downloaded JAR file: {}", jar.display());
        Ok(jar)
    }
}
