//! Resource pooling for browser processes and their contexts
//!
//! Two layered pools share one lifecycle model: `BrowserPool` owns engine
//! processes under a hard cap, `ContextPool` multiplexes isolated contexts
//! across them. Each pool serializes all collection mutation under a single
//! lock and fails fast on capacity; backpressure lives in the executor's
//! semaphore, never here.

// Sub-modules
pub mod browser;
pub mod context;
pub mod memory;
pub mod recycling;

// Re-exports for public API
pub use browser::{BrowserInstance, BrowserLease, BrowserPool};
pub use context::{ContextInstance, ContextLease, ContextPool};
pub use memory::{MemoryProbe, sysinfo_probe};
pub use recycling::RecyclingPolicy;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a pooled resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Ready to be handed out
    Available,
    /// Currently serving a task or hosting an acquisition
    InUse,
    /// Being closed; still in the collection until close finishes
    Recycling,
    /// Closed; removed from the collection permanently
    Dead,
}

impl ResourceState {
    /// Whether this resource still counts against its pool's cap.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        !matches!(self, Self::Dead)
    }
}
