//! Test utilities
//!
//! Helpers shared by unit tests and the integration suite: one-time logging
//! setup and small in-memory JAR fixtures.
//!
//! Enabled for `cfg(test)` and for the `test-utils` feature.

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Respects `RUST_LOG` when `level` is `None`; does nothing if neither is set.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Builds a ZIP archive in memory from `(name, contents)` pairs.
#[must_use]
pub fn jar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A minimal runnable-looking JAR: a manifest plus one class file.
#[must_use]
pub fn server_jar_bytes(marker: &str) -> Vec<u8> {
    jar_bytes(&[
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\nMain-Class: io.papermc.paperclip.Main\n"),
        ("io/papermc/paperclip/Main.class", marker.as_bytes()),
    ])
}

/// Writes a ZIP archive with the given entries to `path`.
pub fn write_test_jar(path: &Path, entries: &[(&str, &[u8])]) {
    std::fs::write(path, jar_bytes(entries)).unwrap();
}

/// Writes a well-formed ZIP archive with no entries (22 bytes).
pub fn write_empty_archive(path: &Path) {
    std::fs::write(path, jar_bytes(&[])).unwrap();
}
