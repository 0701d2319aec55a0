//! Test utilities: an in-memory engine adapter for exercising the pools
//! without launching real browsers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::FutureExt;
use stealthswarm::{ContextHandle, ContextOptions, EngineFactory, EngineHandle, PageHandle};
use tokio::sync::Mutex;

/// Counters observing mock engine activity across a test.
#[derive(Default)]
pub struct MockStats {
    pub engines_launched: AtomicU64,
    pub engines_closed: AtomicU64,
    pub contexts_created: AtomicU64,
    pub contexts_closed: AtomicU64,
    pub pages_created: AtomicU64,
    pub pages_closed: AtomicU64,
    pub page_resets: AtomicU64,
}

/// Behavior knobs for mock engines produced by one factory.
#[derive(Clone, Copy, Default)]
pub struct MockBehavior {
    /// Every launch fails.
    pub fail_launch: bool,
    /// Every `new_context` fails.
    pub fail_contexts: bool,
    /// Engine `close` returns an error (after counting the close).
    pub fail_close: bool,
}

struct MockEngine {
    stats: Arc<MockStats>,
    behavior: MockBehavior,
}

#[async_trait]
impl EngineHandle for MockEngine {
    async fn new_context(&self, _options: ContextOptions<'_>) -> Result<Box<dyn ContextHandle>> {
        if self.behavior.fail_contexts {
            return Err(anyhow!("mock context creation refused"));
        }
        self.stats.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockContext {
            stats: Arc::clone(&self.stats),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.stats.engines_closed.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_close {
            return Err(anyhow!("mock engine close failed"));
        }
        Ok(())
    }
}

struct MockContext {
    stats: Arc<MockStats>,
}

#[async_trait]
impl ContextHandle for MockContext {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        self.stats.pages_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            stats: Arc::clone(&self.stats),
            url: Mutex::new("about:blank".to_string()),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.stats.contexts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockPage {
    stats: Arc<MockStats>,
    url: Mutex<String>,
}

#[async_trait]
impl PageHandle for MockPage {
    async fn goto(&self, url: &str) -> Result<()> {
        *self.url.lock().await = url.to_string();
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        let url = self.url.lock().await.clone();
        Ok(format!("<html><body>{url}</body></html>"))
    }

    async fn reset(&self) -> Result<()> {
        self.stats.page_resets.fetch_add(1, Ordering::SeqCst);
        *self.url.lock().await = "about:blank".to_string();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Build a factory with custom behavior, plus its stats handle.
#[allow(dead_code)]
pub fn mock_factory_with(behavior: MockBehavior) -> (EngineFactory, Arc<MockStats>) {
    let stats = Arc::new(MockStats::default());
    let factory_stats = Arc::clone(&stats);

    let factory: EngineFactory = Arc::new(move || {
        let stats = Arc::clone(&factory_stats);
        async move {
            if behavior.fail_launch {
                return Err(anyhow!("mock launch refused"));
            }
            stats.engines_launched.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockEngine { stats, behavior }) as Box<dyn EngineHandle>)
        }
        .boxed()
    });

    (factory, stats)
}

/// Build a well-behaved factory, plus its stats handle.
#[allow(dead_code)]
pub fn mock_factory() -> (EngineFactory, Arc<MockStats>) {
    mock_factory_with(MockBehavior::default())
}
