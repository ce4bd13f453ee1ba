//! System memory query and heap sizing.

use tracing::{debug, warn};

const BYTES_PER_KIB: u64 = 1024;
const KIB_PER_GIB: u64 = 1024 * 1024;

/// Physical memory in whole gigabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemMemory {
    pub total_gb: u32,
    pub available_gb: u32,
}

/// Parses `/proc/meminfo`.
///
/// Kernels older than 3.14 have no `MemAvailable`; `MemFree` stands in.
#[must_use]
pub fn parse_meminfo(content: &str) -> Option<SystemMemory> {
    let field = |name: &str| {
        content.lines().find_map(|line| {
            let rest = line.strip_prefix(name)?.strip_prefix(':')?;
            let mut parts = rest.split_whitespace();
            let value: u64 = parts.next()?.parse().ok()?;
            match parts.next() {
                Some("kB") | None => Some(value),
                Some(_) => Some(value / BYTES_PER_KIB),
            }
        })
    };

    let total = field("MemTotal")?;
    let available = field("MemAvailable").or_else(|| field("MemFree"))?;
    let to_gb = |kib: u64| u32::try_from(kib / KIB_PER_GIB).unwrap_or(u32::MAX);
    Some(SystemMemory {
        total_gb: to_gb(total),
        available_gb: to_gb(available),
    })
}

/// Reads system memory. Returns `None` where it cannot be determined.
pub async fn query_system_memory() -> Option<SystemMemory> {
    if !cfg!(target_os = "linux") {
        debug!("System memory query is only supported on Linux");
        return None;
    }

    match tokio::fs::read_to_string("/proc/meminfo").await {
        Ok(content) => parse_meminfo(&content),
        Err(e) => {
            debug!("Failed to read /proc/meminfo: {e}");
            None
        }
    }
}

/// Chooses the maximum heap in GB.
///
/// - `configured_max > 0` is used as is, unless it exceeds available memory,
///   in which case it drops to `available - 1`.
/// - otherwise `percentage` of available memory is used, always leaving at
///   least 1 GB free.
///
/// The result never goes below `min_ram`. Without a memory reading the
/// configured maximum is used, or `min_ram + 2` when none is configured.
#[must_use]
pub fn calculate_max_ram(configured_max: u32, percentage: u32, min_ram: u32, memory: Option<SystemMemory>) -> u32 {
    let Some(memory) = memory else {
        return if configured_max > 0 { configured_max } else { min_ram + 2 };
    };
    let available = memory.available_gb;

    if configured_max > 0 {
        if configured_max <= available {
            return configured_max;
        }
        let safe = available.saturating_sub(1);
        warn!("Configured max_ram ({configured_max}GB) exceeds available RAM ({available}GB), adjusting to {safe}GB");
        return safe.max(min_ram);
    }

    let mut calculated = u32::try_from(u64::from(available) * u64::from(percentage) / 100).unwrap_or(available);
    if available.saturating_sub(calculated) < 1 {
        calculated = available.saturating_sub(1);
    }
    calculated.max(min_ram)
}
