//! Error handling for the launcher
//!
//! This module provides the error types shared by every core component and the
//! user-facing rendering of those errors. The design mirrors two needs:
//! 1. **Strongly-typed errors** so callers can branch on what went wrong
//!    (retry, prompt, continue, or abort)
//! 2. **User-friendly messages** with actionable suggestions for the CLI
//!
//! # Error Categories
//!
//! Every [`LauncherError`] belongs to exactly one [`ErrorCategory`]:
//! - **Transient network**: connection refused, timeouts, 5xx. Retried by the fetcher.
//! - **Upstream unavailable**: retries exhausted, malformed feed responses, persistent 4xx.
//!   Update checks treat these as "no update this run".
//! - **Integrity violation**: checksum mismatch or a structurally broken archive.
//!   Never silently trusted.
//! - **Filesystem failure**: permissions, disk full, path conflicts.
//! - **Install failed (restored)** / **install failed (unrecoverable)**: the two
//!   outcomes of a failed self-update swap.
//!
//! Use [`user_friendly_error`] to turn any `anyhow::Error` into an [`ErrorContext`]
//! that can be displayed with colors and suggestions.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`LauncherError`], used for propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Retryable network failure.
    TransientNetwork,
    /// The upstream could not be used during this run.
    UpstreamUnavailable,
    /// Content failed checksum or structural validation.
    IntegrityViolation,
    /// Local filesystem operation failed.
    FilesystemFailure,
    /// Self-update swap failed but the previous executable is back in place.
    InstallFailedRestored,
    /// Self-update swap failed and the previous executable could not be restored.
    InstallFailedUnrecoverable,
    /// The operation was cancelled by the user.
    Cancelled,
    /// Invalid configuration or environment (Java, config file).
    Environment,
}

/// Reasons a file fails structural (archive container) validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("file does not exist")]
    NotFound,

    #[error("path is a directory")]
    IsDirectory,

    #[error("file is empty")]
    Empty,

    #[error("file is too small to be an archive ({size} bytes, need at least {minimum})")]
    TooSmall {
        size: u64,
        minimum: u64,
    },

    #[error("missing archive signature (expected {expected}, found {found})")]
    BadMagic {
        expected: String,
        found: String,
    },

    #[error("archive directory cannot be parsed: {reason}")]
    CorruptContainer {
        reason: String,
    },

    #[error("archive contains no entries")]
    NoEntries,
}

/// Errors produced by the launcher's core components.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// The artifact's SHA-256 differs from the expected digest.
    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A checksum sidecar exists but does not hold a 64-character hex digest.
    #[error("Malformed checksum file {}: {reason}", .path.display())]
    MalformedDigest {
        path: PathBuf,
        reason: String,
    },

    /// The artifact is not a well-formed archive container.
    #[error("Invalid archive {}: {kind}", .path.display())]
    Structure {
        path: PathBuf,
        kind: StructureError,
    },

    /// A staged launcher executable failed its pre-install check.
    #[error("Staged update {} is not usable: {reason}", .path.display())]
    StagedUpdateInvalid {
        path: PathBuf,
        reason: String,
    },

    /// One HTTP attempt failed in a way worth retrying.
    #[error("Request to {url} failed: {cause}")]
    TransientNetwork {
        url: String,
        status: Option<u16>,
        cause: String,
    },

    /// Every attempt of a retried request failed.
    #[error("Request to {url} failed after {attempts} attempts: {last_cause}")]
    FetchFailed {
        url: String,
        attempts: u32,
        last_cause: String,
    },

    /// A feed answered with something unusable (bad status, bad JSON, empty list).
    #[error("{feed} is unavailable: {reason}")]
    UpstreamUnavailable {
        feed: String,
        reason: String,
    },

    /// The release feed returned 404 even though a credential was sent.
    #[error("Release feed not found (HTTP 404): {url}")]
    ReleaseFeedNotFound {
        url: String,
    },

    /// The release feed returned 404 to an unauthenticated request.
    #[error(
        "Release feed returned HTTP 404 for an unauthenticated request: {url} (the repository may be private; set github_token in config.yaml or LAUNCHER_GITHUB_TOKEN)"
    )]
    ReleaseFeedNeedsCredential {
        url: String,
    },

    /// The release has no asset for this operating system and architecture.
    #[error("No release asset published for {os}/{arch}")]
    NoPlatformAsset {
        os: String,
        arch: String,
    },

    /// The user interrupted the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// A filesystem operation failed.
    #[error("Failed to {operation} {}: {source}", .path.display())]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The swap failed and the previous executable was put back.
    #[error("Failed to install update (previous executable restored): {cause}")]
    InstallFailedRestored {
        cause: String,
    },

    /// The swap failed and the previous executable could not be put back.
    #[error(
        "Failed to install update and failed to restore the previous executable: {cause} (restore error: {restore_cause}); the previous executable is at {}",
        .backup.display()
    )]
    InstallFailedUnrecoverable {
        cause: String,
        restore_cause: String,
        backup: PathBuf,
    },

    /// Configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    /// A server JAR whose file name carries no version and build number.
    #[error("Cannot read version and build from JAR name {}", .path.display())]
    UnrecognizedJarName {
        path: PathBuf,
    },

    /// Java is missing, unparseable, or too old.
    #[error("{message}")]
    Java {
        message: String,
    },

    /// IO error without additional context.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LauncherError {
    /// Build a [`LauncherError::FileSystem`] from an IO error and the path it concerns.
    pub fn fs(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// The taxonomy bucket this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::TransientNetwork {
                ..
            } => ErrorCategory::TransientNetwork,
            Self::FetchFailed {
                ..
            }
            | Self::UpstreamUnavailable {
                ..
            }
            | Self::ReleaseFeedNotFound {
                ..
            }
            | Self::ReleaseFeedNeedsCredential {
                ..
            }
            | Self::NoPlatformAsset {
                ..
            } => ErrorCategory::UpstreamUnavailable,
            Self::ChecksumMismatch {
                ..
            }
            | Self::MalformedDigest {
                ..
            }
            | Self::Structure {
                ..
            }
            | Self::StagedUpdateInvalid {
                ..
            } => ErrorCategory::IntegrityViolation,
            Self::FileSystem {
                ..
            }
            | Self::Io(_) => ErrorCategory::FilesystemFailure,
            Self::InstallFailedRestored {
                ..
            } => ErrorCategory::InstallFailedRestored,
            Self::InstallFailedUnrecoverable {
                ..
            } => ErrorCategory::InstallFailedUnrecoverable,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Config {
                ..
            }
            | Self::Java {
                ..
            }
            | Self::UnrecognizedJarName {
                ..
            } => ErrorCategory::Environment,
        }
    }

    /// Whether the fetcher should spend another attempt on this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::TransientNetwork)
    }

    /// Whether this error is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error wrapper carrying optional details and a suggestion for the user.
#[derive(Debug)]
pub struct ErrorContext {
    pub message: String,
    pub category: Option<ErrorCategory>,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap a [`LauncherError`].
    #[must_use]
    pub fn new(error: &LauncherError) -> Self {
        Self {
            message: error.to_string(),
            category: Some(error.category()),
            suggestion: None,
            details: None,
        }
    }

    /// Wrap a plain message with no known category.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: None,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    ///
    /// An unrecoverable install failure is rendered with its own banner since
    /// the launcher executable itself may be missing afterwards.
    pub fn display(&self) {
        if self.category == Some(ErrorCategory::InstallFailedUnrecoverable) {
            eprintln!();
            eprintln!("{}", "!!! LAUNCHER SELF-UPDATE FAILED !!!".red().bold());
            eprintln!("{}", "The launcher executable could not be restored.".red().bold());
        }

        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// The whole `anyhow` chain is searched for a [`LauncherError`], so context
/// added with `.context(..)` does not hide the typed error underneath.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let typed = error.chain().find_map(|cause| cause.downcast_ref::<LauncherError>());

    let Some(launcher_error) = typed else {
        let permission_denied = error
            .chain()
            .filter_map(|c| c.downcast_ref::<std::io::Error>())
            .any(|e| e.kind() == std::io::ErrorKind::PermissionDenied);
        if permission_denied {
            return ErrorContext::from_message(format!("{error:#}"))
                .with_suggestion("Check file ownership and permissions in the server directory");
        }
        return ErrorContext::from_message(format!("{error:#}"));
    };

    let context = ErrorContext::new(launcher_error);
    let top = error.to_string();
    let context = if top == launcher_error.to_string() {
        context
    } else {
        context.with_details(top)
    };

    match launcher_error {
        LauncherError::ChecksumMismatch {
            path, ..
        } => context.with_suggestion(format!(
            "Delete {} and its .sha256 file, then start the launcher again to re-download it",
            path.display()
        )),
        LauncherError::Structure {
            ..
        } => context.with_suggestion(
            "The file is corrupted or truncated; remove it and let the launcher download it again",
        ),
        LauncherError::FetchFailed {
            ..
        }
        | LauncherError::TransientNetwork {
            ..
        } => context.with_suggestion("Check your internet connection and try again"),
        LauncherError::ReleaseFeedNeedsCredential {
            ..
        } => context.with_suggestion(
            "Set github_token in config.yaml or export LAUNCHER_GITHUB_TOKEN with a token that can read the repository",
        ),
        LauncherError::InstallFailedUnrecoverable {
            backup, ..
        } => context.with_suggestion(format!(
            "Restore the launcher manually by renaming {} back to the original executable name",
            backup.display()
        )),
        LauncherError::Java {
            ..
        } => context.with_suggestion(
            "Install Java 17 or newer, or point java_path in config.yaml at an existing installation",
        ),
        LauncherError::Config {
            ..
        } => context.with_suggestion("Fix the value in config.yaml or delete the file to regenerate defaults"),
        _ => context,
    }
}
