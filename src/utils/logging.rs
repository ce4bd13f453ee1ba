//! Tracing subscriber setup for the launcher binary.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (e.g. `"info"`, `"debug"`) is
/// used. Console output goes to stderr. When `log_file` is given, the same
/// events are also appended to it without ANSI colors; if the file cannot be
/// opened a warning is logged and only the console is used.
///
/// Calling this more than once is harmless.
pub fn init_logging(level: &str, log_file: Option<&Path>) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let mut file_error = None;
    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            Err(e) => {
                file_error = Some(format!("Failed to open log file {}: {e}", path.display()));
                None
            }
        }
    });

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Some(message) = file_error {
        tracing::warn!("{message}");
    }
}
