pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod pool;
pub mod stats;

pub use config::SwarmConfig;
pub use engine::{
    ChromiumEngine, ContextHandle, ContextOptions, EngineFactory, EngineHandle, PageHandle,
};
pub use error::{SwarmError, SwarmResult};
pub use executor::HighVolumeExecutor;
pub use pool::{
    BrowserInstance, BrowserLease, BrowserPool, ContextInstance, ContextLease, ContextPool,
    MemoryProbe, RecyclingPolicy, ResourceState,
};
pub use stats::{BrowserPoolStats, ContextPoolStats, ExecutorStats};

/// Build an executor backed by the chromiumoxide engine adapter.
///
/// Convenience for the common case; embedders with their own engine
/// adapter construct `HighVolumeExecutor::new` with a custom factory.
#[must_use]
pub fn chromium_executor(config: SwarmConfig) -> HighVolumeExecutor {
    let headless = config.headless();
    HighVolumeExecutor::new(config, ChromiumEngine::factory(headless))
}
