//! JVM flag selection and the server process.

use crate::constants::SERVER_SHUTDOWN_GRACE;
use crate::core::LauncherError;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Oldest Java major version with ZGC.
pub const MIN_JAVA_VERSION_ZGC: u32 = 11;

/// Oldest Java major version accepting `-XX:+ZGenerational`.
pub const MIN_JAVA_VERSION_GENERATIONAL_ZGC: u32 = 17;

/// Below this heap size G1 tends to beat ZGC.
const ZGC_RECOMMENDED_MIN_GB: u32 = 4;

/// Aikar's G1 tuning flags (<https://mcflags.emc.gs>).
pub const AIKAR_FLAGS: &[&str] = &[
    "-XX:+UseG1GC",
    "-XX:+ParallelRefProcEnabled",
    "-XX:MaxGCPauseMillis=200",
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+DisableExplicitGC",
    "-XX:+AlwaysPreTouch",
    "-XX:G1NewSizePercent=30",
    "-XX:G1MaxNewSizePercent=40",
    "-XX:G1HeapRegionSize=8M",
    "-XX:G1ReservePercent=20",
    "-XX:G1HeapWastePercent=5",
    "-XX:G1MixedGCCountTarget=4",
    "-XX:InitiatingHeapOccupancyPercent=15",
    "-XX:G1MixedGCLiveThresholdPercent=90",
    "-XX:G1RSetUpdatingPauseTimePercent=5",
    "-XX:SurvivorRatio=32",
    "-XX:+PerfDisableSharedMem",
    "-XX:MaxTenuringThreshold=1",
    "-Dusing.aikars.flags=https://mcflags.emc.gs",
    "-Daikars.new.flags=true",
    "-Dfile.encoding=UTF-8",
];

pub const ZGC_FLAGS: &[&str] = &[
    "-XX:+UseZGC",
    "-XX:+ZGenerational",
    "-XX:+DisableExplicitGC",
    "-XX:+AlwaysPreTouch",
    "-XX:+PerfDisableSharedMem",
    "-Dfile.encoding=UTF-8",
];

/// Everything needed to start the server.
#[derive(Debug, Clone)]
pub struct ServerLaunch {
    pub java: PathBuf,
    pub java_major: u32,
    pub jar: PathBuf,
    pub work_dir: PathBuf,
    pub min_ram_gb: u32,
    pub max_ram_gb: u32,
    pub use_zgc: bool,
    pub server_args: Vec<String>,
}

impl ServerLaunch {
    /// Heap, GC, and `-jar` arguments followed by the server's own arguments.
    pub fn jvm_args(&self) -> Result<Vec<String>, LauncherError> {
        let mut args = vec![format!("-Xms{}G", self.min_ram_gb), format!("-Xmx{}G", self.max_ram_gb)];

        if self.use_zgc {
            if self.java_major < MIN_JAVA_VERSION_ZGC {
                return Err(LauncherError::Java {
                    message: format!(
                        "ZGC requires Java {MIN_JAVA_VERSION_ZGC} or higher, found Java {}",
                        self.java_major
                    ),
                });
            }

            let generational = self.java_major >= MIN_JAVA_VERSION_GENERATIONAL_ZGC;
            args.extend(
                ZGC_FLAGS
                    .iter()
                    .filter(|flag| generational || !flag.contains("ZGenerational"))
                    .map(|flag| (*flag).to_string()),
            );
            if generational {
                info!("Using Z Garbage Collector (ZGC)");
            } else {
                info!("Using Z Garbage Collector (ZGC) without generational mode (needs Java 17+)");
            }
            if self.max_ram_gb < ZGC_RECOMMENDED_MIN_GB {
                warn!("ZGC enabled but max RAM is below {ZGC_RECOMMENDED_MIN_GB}GB; G1GC may perform better");
            }
        } else {
            info!("Using G1 Garbage Collector (G1GC)");
            args.extend(AIKAR_FLAGS.iter().map(|flag| (*flag).to_string()));
        }

        args.push("-jar".to_string());
        args.push(self.jar.display().to_string());
        args.extend(self.server_args.iter().cloned());
        Ok(args)
    }

    /// Runs the server with inherited stdio until it exits.
    ///
    /// When `cancel` fires the server is given [`SERVER_SHUTDOWN_GRACE`] to
    /// stop on its own (a terminal Ctrl-C reaches it directly), then killed.
    /// Returns [`LauncherError::Cancelled`] once the process is gone.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ExitStatus, LauncherError> {
        let args = self.jvm_args()?;
        info!("Starting server: {} {}", self.java.display(), args.join(" "));

        let mut child = Command::new(&self.java)
            .args(&args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LauncherError::Java {
                message: format!("Failed to start server with {}: {e}", self.java.display()),
            })?;

        tokio::select! {
            status = child.wait() => {
                return status.map_err(|e| LauncherError::Java {
                    message: format!("Failed to wait for the server process: {e}"),
                });
            }
            () = cancel.cancelled() => {}
        }

        info!("Shutdown requested, waiting for the server to stop...");
        match tokio::time::timeout(SERVER_SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => info!("Server stopped ({status})"),
            Ok(Err(e)) => warn!("Failed to wait for the server process: {e}"),
            Err(_) => {
                warn!("Server did not stop within {}s, killing it", SERVER_SHUTDOWN_GRACE.as_secs());
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill the server process: {e}");
                }
            }
        }
        Err(LauncherError::Cancelled)
    }
}
