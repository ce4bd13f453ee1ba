//! The managed Paper server.
//!
//! - [`jar`]: finding, verifying, downloading, and updating the server JAR
//! - [`java`]: locating a suitable Java runtime
//! - [`memory`]: system memory and heap sizing
//! - [`process`]: JVM flags and running the server
//! - [`eula`]: the `eula.txt` acceptance file

pub mod eula;
pub mod jar;
pub mod java;
pub mod memory;
pub mod process;

pub use eula::ensure_eula;
pub use jar::{
    JarVerification, check_update, discard_stale_partials, download_jar, find_jar_file, parse_jar_name, update_jar,
    verify_existing,
};
pub use java::{JavaRuntime, check_java};
pub use memory::{SystemMemory, calculate_max_ram, query_system_memory};
pub use process::ServerLaunch;
