//! Command-line interface for the launcher.
//!
//! The launcher has a single job, so there are no subcommands: the flags
//! adjust logging, pick the config file, and override a few settings, and
//! then [`launch::Launcher`] runs the launch sequence.
//!
//! # Examples
//!
//! ```bash
//! paper-launcher                          # use ./config.yaml
//! paper-launcher -c server.yaml -w ./srv  # other config and server directory
//! paper-launcher -v 1.21.4 --no-pause     # pin a Minecraft version, exit without waiting
//! ```

pub mod launch;
pub mod prompt;

use crate::config::LauncherConfig;
use crate::context::LaunchContext;
use crate::utils::init_logging;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use launch::{LaunchOutcome, Launcher};

/// Launcher for Paper Minecraft servers.
#[derive(Parser, Debug)]
#[command(
    name = "paper-launcher",
    about = "Download, verify, and run a Paper Minecraft server",
    version,
    long_about = "Keeps a Paper server JAR downloaded and verified, updates itself from its release feed, backs up worlds, and starts the server with tuned JVM flags."
)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Enable verbose logging (same as --log-level debug).
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Config file path; created with defaults when missing.
    #[arg(short = 'c', long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the server working directory.
    #[arg(short = 'w', long, value_name = "DIR")]
    work_dir: Option<String>,

    /// Override the Minecraft version (e.g. 1.21.4 or latest).
    #[arg(short = 'v', long = "minecraft-version", value_name = "VERSION")]
    minecraft_version: Option<String>,

    /// Exit without waiting for Enter.
    #[arg(long)]
    no_pause: bool,

    /// Disable progress bars.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// The level handed to the log filter.
    #[must_use]
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }

    #[must_use]
    pub const fn no_pause(&self) -> bool {
        self.no_pause
    }

    #[must_use]
    pub const fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }

    /// Loads the config file and applies the command-line overrides.
    pub fn load_config(&self) -> Result<LauncherConfig> {
        let mut config = LauncherConfig::load(&self.config)
            .with_context(|| format!("Failed to load config from {}", self.config.display()))?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut LauncherConfig) {
        if let Some(version) = self.minecraft_version.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            config.minecraft_version = version.to_string();
        }
        if let Some(work_dir) = self.work_dir.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
            config.work_dir = work_dir.to_string();
        }
    }

    /// Runs the launcher.
    pub async fn execute(self) -> Result<LaunchOutcome> {
        let config = self.load_config()?;

        let log_file = config.log_file_enable.then(|| log_file_path(&config));
        init_logging(self.effective_log_level(), log_file.as_deref());

        let cancel = CancellationToken::new();
        spawn_signal_handler(cancel.clone());

        let ctx = LaunchContext::new(&config, cancel, self.show_progress())?;
        Launcher::new(config, ctx).run().await
    }
}

fn log_file_path(config: &LauncherConfig) -> PathBuf {
    let name = config.log_file.trim();
    Path::new(if name.is_empty() { "launcher.log" } else { name }).to_path_buf()
}

/// Cancels `cancel` on the first Ctrl-C or SIGTERM and exits on the second.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown requested, cancelling...");
        cancel.cancel();

        wait_for_shutdown_signal().await;
        warn!("Second shutdown request, exiting immediately");
        std::process::exit(130);
    });
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                () = ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(_) => ctrl_c().await,
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    ctrl_c().await;
}
