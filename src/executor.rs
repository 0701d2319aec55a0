//! High-volume task executor
//!
//! The sole external-facing entry point. Gates global concurrency with a
//! counting semaphore sized `max_concurrent`, acquires a pooled context
//! per task, runs the caller's task against the context's page, and
//! guarantees context-then-slot release on every exit path. Pools below
//! this never block; the semaphore here is the only place callers wait.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::info;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::SwarmConfig;
use crate::engine::{EngineFactory, PageHandle};
use crate::error::{SwarmError, SwarmResult};
use crate::pool::{BrowserPool, ContextPool, MemoryProbe};
use crate::stats::ExecutorStats;

/// Executor over the layered browser/context pools.
///
/// Constructed explicitly and passed by the owner; there is no process-wide
/// instance. Cloning is not provided; share it behind an `Arc`.
pub struct HighVolumeExecutor {
    browsers: Arc<BrowserPool>,
    contexts: ContextPool,
    semaphore: Semaphore,
    shutdown: CancellationToken,
    tasks_started: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
}

impl HighVolumeExecutor {
    /// Build an executor from a configuration and an engine factory.
    #[must_use]
    pub fn new(config: SwarmConfig, factory: EngineFactory) -> Self {
        let browsers = Arc::new(BrowserPool::new(config.clone(), factory));
        Self::assemble(config, browsers)
    }

    /// Same as `new` but with a caller-supplied memory probe.
    #[must_use]
    pub fn with_memory_probe(
        config: SwarmConfig,
        factory: EngineFactory,
        memory_probe: MemoryProbe,
    ) -> Self {
        let browsers = Arc::new(BrowserPool::with_memory_probe(
            config.clone(),
            factory,
            memory_probe,
        ));
        Self::assemble(config, browsers)
    }

    fn assemble(config: SwarmConfig, browsers: Arc<BrowserPool>) -> Self {
        let contexts = ContextPool::new(config.clone(), Arc::clone(&browsers));
        Self {
            browsers,
            contexts,
            semaphore: Semaphore::new(config.max_concurrent()),
            shutdown: CancellationToken::new(),
            tasks_started: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
        }
    }

    /// Pre-warm the browser pool. Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates a pre-warm launch failure.
    pub async fn start(&self) -> SwarmResult<()> {
        self.browsers.start().await
    }

    /// Shut down: stop admitting work, recycle every context, close every
    /// browser (each close bounded by `timeout`). Idempotent; close
    /// failures are logged and swallowed.
    pub async fn stop(&self, timeout: Duration) {
        if !self.shutdown.is_cancelled() {
            info!("Stopping executor");
        }
        self.shutdown.cancel();
        self.contexts.cleanup().await;
        self.browsers.stop(timeout).await;
    }

    /// Run one task against a pooled page.
    ///
    /// Suspends on the admission semaphore until a slot frees, acquires a
    /// context (pool capacity errors propagate as execution failures), and
    /// invokes `task_fn` with the page and a child of the executor's
    /// shutdown token. The context is released with the task's error flag
    /// forwarded, then the slot, on every exit path.
    ///
    /// # Errors
    ///
    /// `Cancelled` after `stop`; `Capacity`/`Creation` from the pools;
    /// `Task` wrapping the caller's error unchanged. No retries.
    pub async fn execute<F, Fut, T>(
        &self,
        fingerprint: Option<&str>,
        proxy: Option<&str>,
        task_fn: F,
    ) -> SwarmResult<T>
    where
        F: FnOnce(Arc<dyn PageHandle>, CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if self.shutdown.is_cancelled() {
            return Err(SwarmError::Cancelled);
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SwarmError::Cancelled)?;

        // Re-check: stop() may have landed while we waited for the slot.
        if self.shutdown.is_cancelled() {
            return Err(SwarmError::Cancelled);
        }

        self.tasks_started.fetch_add(1, Ordering::Relaxed);

        let lease = match self.contexts.acquire(fingerprint, proxy).await {
            Ok(lease) => lease,
            Err(e) => {
                self.tasks_failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let result = task_fn(Arc::clone(&lease.page), self.shutdown.child_token()).await;
        let had_error = result.is_err();

        // Context first, then the slot (permit drops at scope end).
        self.contexts.release(&lease.id, had_error).await;

        match result {
            Ok(value) => {
                self.tasks_completed.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(source) => {
                self.tasks_failed.fetch_add(1, Ordering::Relaxed);
                Err(SwarmError::Task(source))
            }
        }
    }

    /// Aggregate point-in-time snapshot with nested pool stats.
    pub async fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            browser_pool: self.browsers.stats().await,
            context_pool: self.contexts.stats().await,
        }
    }
}
