//! Process memory probe for pressure-based eviction
//!
//! The browser pool compares current process RSS against its configured
//! ceiling on every acquire. The probe is a plain closure so embedders and
//! tests can substitute their own measurement; the default reads RSS via
//! `sysinfo`.

use std::sync::{Arc, Mutex};

use log::warn;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Returns the current process memory footprint in MiB.
pub type MemoryProbe = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Default probe: RSS of the current process, in MiB.
///
/// Returns 0 when the process cannot be inspected, which disables
/// eviction for that acquire rather than failing it.
#[must_use]
pub fn sysinfo_probe() -> MemoryProbe {
    let system = Mutex::new(System::new());
    let pid = Pid::from_u32(std::process::id());

    Arc::new(move || {
        let mut system = match system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );
        match system.process(pid) {
            Some(process) => process.memory() / (1024 * 1024),
            None => {
                warn!("Could not read memory for pid {pid}; skipping eviction check");
                0
            }
        }
    })
}
