//! Progress indicators for downloads and long-running steps
//!
//! Thin wrapper over `indicatif` with the launcher's styling. Progress output
//! is suppressed entirely when:
//! - the `PAPER_LAUNCHER_NO_PROGRESS` environment variable is set
//! - the caller asks for a hidden bar (`--no-progress`)
//!
//! # Examples
//!
//! ```rust
//! use paper_launcher::utils::progress::ProgressBar;
//!
//! let progress = ProgressBar::new_bytes(Some(1024), "paper-1.21.4-100.jar");
//! progress.inc(512);
//! progress.inc(512);
//! progress.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use std::time::Duration;

/// Environment variable that disables all progress output.
pub const NO_PROGRESS_ENV: &str = "PAPER_LAUNCHER_NO_PROGRESS";

fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

fn bytes_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn unknown_length_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner} {msg} {bytes} ({bytes_per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// A progress bar with consistent styling.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// A byte-counting bar for a download. `len` is the `Content-Length` if known.
    pub fn new_bytes(len: Option<u64>, label: impl Into<String>) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else if let Some(len) = len {
            let bar = IndicatifBar::new(len);
            bar.set_style(bytes_style());
            bar
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(unknown_length_style());
            bar
        };
        bar.set_message(label.into());
        Self {
            inner: bar,
        }
    }

    /// A spinner for indeterminate work.
    pub fn new_spinner(label: impl Into<String>) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_message(label.into());
        Self {
            inner: bar,
        }
    }

    /// A bar that never draws anything.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Stops the bar where it is, leaving the last state on screen.
    pub fn abandon(&self) {
        self.inner.abandon();
    }
}
