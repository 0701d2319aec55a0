//! Read-only statistics snapshots
//!
//! Point-in-time counters for monitoring and dashboards. Snapshots are
//! plain values serialized to JSON by the reporting layer; nothing in the
//! engine makes control decisions from them.

use serde::Serialize;

/// Snapshot of `BrowserPool` counters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BrowserPoolStats {
    /// Engines launched over the pool's lifetime
    pub browsers_created: u64,
    /// Engines closed by recycling (usage, age, errors, memory pressure)
    pub browsers_recycled: u64,
    /// Non-DEAD browsers currently in the collection
    pub browsers_live: usize,
    /// Browsers currently AVAILABLE
    pub browsers_available: usize,
}

/// Snapshot of `ContextPool` counters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ContextPoolStats {
    /// Contexts created over the pool's lifetime
    pub contexts_created: u64,
    /// Contexts closed by recycling
    pub contexts_recycled: u64,
    /// Acquisitions served by an existing context instead of a new one
    pub contexts_reused: u64,
    /// Non-DEAD contexts currently in the collection
    pub contexts_live: usize,
    /// Contexts currently AVAILABLE
    pub contexts_available: usize,
}

/// Aggregate snapshot exposed by `HighVolumeExecutor`
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ExecutorStats {
    /// Tasks admitted past the semaphore
    pub tasks_started: u64,
    /// Tasks whose `task_fn` returned Ok
    pub tasks_completed: u64,
    /// Tasks whose `task_fn` returned Err, or that failed to acquire a context
    pub tasks_failed: u64,
    pub browser_pool: BrowserPoolStats,
    pub context_pool: ContextPoolStats,
}
