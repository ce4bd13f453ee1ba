//! Launcher self-update.
//!
//! The launcher updates itself from its release feed before it does anything
//! else, since a self-update changes which code runs the rest of the launch.
//!
//! # Module Structure
//!
//! - [`SelfUpdater`] - the check / download / validate / install state machine
//! - [`BackupManager`] - `<exe>.old` backup and restore around the swap
//!
//! # Update Process
//!
//! 1. **Check**: query the latest release; skip development builds, releases
//!    that are not newer, and releases without an asset for this platform
//! 2. **Confirm**: install automatically (`auto_update_launcher`) or ask
//! 3. **Download**: stream the asset to `<exe>.new` through the resilient fetcher
//! 4. **Validate**: the staged file must be non-empty and readable
//! 5. **Install**: `<exe>` becomes `<exe>.old`, `<exe>.new` becomes `<exe>`;
//!    a failed second rename restores the backup immediately
//! 6. **Restart**: the new executable only runs on the next start
//!
//! # Failure Handling
//!
//! An unreachable or malformed release feed never blocks the launch: the
//! check reports "no update" and the launch continues. Download and
//! validation failures remove the staged file and leave the running
//! executable alone. The only failure that stops the launcher is an install
//! whose restore also failed, reported with the path of the `.old` backup.
//!
//! # Platform Notes
//!
//! The running executable can be renamed but not overwritten on Windows,
//! which is why the update is staged beside it and swapped by rename. On
//! Unix the executable bit is set on the staged file and again after the swap.

pub mod backup;
pub mod self_updater;


pub use backup::BackupManager;
pub use self_updater::{AvailableUpdate, NoUpdateReason, SelfUpdater, UpdateCheck, UpdateOutcome, UpdateState};
