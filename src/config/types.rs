//! Core configuration types for the pooling engine
//!
//! This module contains the main `SwarmConfig` struct that defines pool
//! caps, recycling thresholds, and executor admission control.

use serde::{Deserialize, Serialize};

/// Main configuration struct for the browser pool, context pool, and executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Hard cap on concurrently existing browser processes.
    ///
    /// **INVARIANT:** the count of non-DEAD browsers never exceeds this.
    /// `BrowserPool::acquire` fails fast with a capacity error instead of
    /// blocking when the cap is reached with nothing recyclable.
    pub(crate) max_browsers: usize,

    /// Cap on non-DEAD contexts bound to a single browser.
    pub(crate) max_contexts_per_browser: usize,

    /// Size of the executor's admission semaphore.
    ///
    /// The only bounded-wait primitive in the engine. Should be at most
    /// `max_browsers * max_contexts_per_browser`, otherwise pool capacity
    /// errors surface as task failures instead of queuing.
    pub(crate) max_concurrent: usize,

    /// Process memory ceiling in MiB; 0 disables memory-pressure eviction.
    ///
    /// When exceeded, the next `BrowserPool::acquire` recycles the single
    /// oldest AVAILABLE browser before proceeding (best-effort).
    pub(crate) memory_limit_mb: u64,

    /// Recycle a browser after this many completed acquisition cycles.
    ///
    /// Default: 100
    pub(crate) browser_max_tasks: u64,

    /// Recycle a browser after this many recorded errors.
    ///
    /// Default: 10
    pub(crate) browser_max_errors: u64,

    /// Recycle a browser older than this many seconds.
    ///
    /// Default: 1800 (30 minutes)
    pub(crate) browser_max_age_secs: u64,

    /// Recycle a context after this many completed tasks.
    ///
    /// Default: 50
    pub(crate) context_max_tasks: u64,

    /// Run browsers headless. Consumed by the engine adapter factory, not
    /// by the pools themselves.
    pub(crate) headless: bool,
}

impl SwarmConfig {
    /// Create a builder with default values
    #[must_use]
    pub fn builder() -> super::builder::SwarmConfigBuilder {
        super::builder::SwarmConfigBuilder::default()
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        super::builder::SwarmConfigBuilder::default().build_unchecked()
    }
}
