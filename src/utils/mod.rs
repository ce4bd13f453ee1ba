//! Cross-platform utilities and helpers
//!
//! - [`fs`] - atomic writes, file replacement, and `.part` staging guards
//! - [`logging`] - tracing subscriber setup
//! - [`progress`] - progress bars for downloads

pub mod fs;
pub mod logging;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, replace_file, with_suffix};
pub use logging::init_logging;
pub use progress::ProgressBar;
