//! Core types shared by every launcher component
//!
//! The launcher's failure handling is built around a single error taxonomy so
//! that each layer can decide whether to retry, prompt, continue, or abort:
//! - **Strongly-typed errors** ([`LauncherError`]) for branching in code
//! - **Categories** ([`ErrorCategory`]) for coarse propagation decisions
//! - **User-friendly contexts** ([`ErrorContext`]) with suggestions for the CLI
//!
//! Update checks swallow [`ErrorCategory::UpstreamUnavailable`] and continue
//! with what is installed; integrity violations are never swallowed.

pub mod error;

pub use error::{ErrorCategory, ErrorContext, LauncherError, StructureError, user_friendly_error};

/// Result alias used by the launcher's core components.
pub type Result<T, E = LauncherError> = std::result::Result<T, E>;
