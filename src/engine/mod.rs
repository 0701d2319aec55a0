//! Engine capability surface
//!
//! One explicit interface per handle type, implemented once per concrete
//! adapter (chromiumoxide here; Playwright-style engines slot in the same
//! way) and selected via an async factory closure. The pools own handle
//! lifecycles exclusively: an engine is closed only by `BrowserPool`, a
//! context/page pair only by `ContextPool`.

pub mod chromium;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

pub use chromium::ChromiumEngine;

/// Options forwarded to `EngineHandle::new_context`.
///
/// Fingerprint and proxy are opaque correlation tags as far as the pools
/// are concerned; an adapter may interpret them (the chromium adapter maps
/// `proxy` to the CDP context's proxy server and ignores `fingerprint`,
/// which belongs to the anti-detection layer upstream).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextOptions<'a> {
    pub fingerprint: Option<&'a str>,
    pub proxy: Option<&'a str>,
}

/// One running browser-engine process.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Create an isolated browsing context inside this engine.
    async fn new_context(
        &self,
        options: ContextOptions<'_>,
    ) -> anyhow::Result<Box<dyn ContextHandle>>;

    /// Close the engine process. Called exactly once, by `BrowserPool`.
    async fn close(&self) -> anyhow::Result<()>;
}

/// One isolated browsing context.
#[async_trait]
pub trait ContextHandle: Send + Sync {
    /// Open a top-level page in this context.
    async fn new_page(&self) -> anyhow::Result<Box<dyn PageHandle>>;

    /// Dispose the context. Called exactly once, by `ContextPool`.
    async fn close(&self) -> anyhow::Result<()>;
}

/// One page, passed through unchanged to caller-supplied tasks.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigate to a URL.
    async fn goto(&self, url: &str) -> anyhow::Result<()>;

    /// Current page HTML.
    async fn content(&self) -> anyhow::Result<String>;

    /// Return the page to a blank state between tasks.
    async fn reset(&self) -> anyhow::Result<()>;

    /// Close the page. Called by `ContextPool` during recycle.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Async factory producing engine processes, supplied by the embedder.
///
/// Launch configuration (headless, executable path, stealth arguments)
/// is captured by the closure, not threaded through the pools.
pub type EngineFactory =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Box<dyn EngineHandle>>> + Send + Sync>;
