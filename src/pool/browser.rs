//! Browser process pool
//!
//! Owns every engine process under a hard cap. Hands out leases against
//! AVAILABLE instances, recycles on usage/age/error thresholds, and evicts
//! the oldest idle browser under memory pressure. Never blocks on
//! capacity: when the pool is full with nothing recyclable, `acquire`
//! fails fast and backpressure is the executor's problem.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ResourceState;
use super::memory::{MemoryProbe, sysinfo_probe};
use super::recycling::RecyclingPolicy;
use crate::config::SwarmConfig;
use crate::engine::{EngineFactory, EngineHandle};
use crate::error::{SwarmError, SwarmResult};
use crate::stats::BrowserPoolStats;

/// Browsers launched eagerly by `start()`, bounded by `max_browsers`.
const PREWARM_COUNT: usize = 3;

/// One pooled engine process with its usage counters.
pub struct BrowserInstance {
    pub id: String,
    /// Exclusively owned by the pool; closed only through recycle or stop.
    engine: Arc<dyn EngineHandle>,
    pub state: ResourceState,
    pub created_at: Instant,
    pub tasks_completed: u64,
    pub contexts_created: u64,
    pub errors: u64,
    pub last_used_at: Option<Instant>,
}

impl BrowserInstance {
    fn new(engine: Arc<dyn EngineHandle>, state: ResourceState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            engine,
            state,
            created_at: Instant::now(),
            tasks_completed: 0,
            contexts_created: 0,
            errors: 0,
            last_used_at: None,
        }
    }
}

/// What `acquire` hands out: the instance id plus the engine handle needed
/// to create contexts on it. The pool keeps lifecycle ownership.
pub struct BrowserLease {
    pub id: String,
    pub engine: Arc<dyn EngineHandle>,
}

impl std::fmt::Debug for BrowserLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserLease").field("id", &self.id).finish()
    }
}

struct BrowserPoolInner {
    browsers: HashMap<String, BrowserInstance>,
    browsers_created: u64,
    browsers_recycled: u64,
    started: bool,
}

/// Bounded pool of engine processes.
pub struct BrowserPool {
    config: SwarmConfig,
    policy: RecyclingPolicy,
    factory: EngineFactory,
    memory_probe: MemoryProbe,
    inner: Mutex<BrowserPoolInner>,
}

impl BrowserPool {
    /// Create a pool with the default process-RSS memory probe.
    #[must_use]
    pub fn new(config: SwarmConfig, factory: EngineFactory) -> Self {
        Self::with_memory_probe(config, factory, sysinfo_probe())
    }

    /// Create a pool with a custom memory probe (embedders measuring
    /// memory their own way, tests driving eviction deterministically).
    #[must_use]
    pub fn with_memory_probe(
        config: SwarmConfig,
        factory: EngineFactory,
        memory_probe: MemoryProbe,
    ) -> Self {
        let policy = RecyclingPolicy::from_config(&config);
        Self {
            config,
            policy,
            factory,
            memory_probe,
            inner: Mutex::new(BrowserPoolInner {
                browsers: HashMap::new(),
                browsers_created: 0,
                browsers_recycled: 0,
                started: false,
            }),
        }
    }

    /// Pre-warm the pool. Idempotent: a second call is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates a launch failure as a creation error; nothing partial is
    /// inserted.
    pub async fn start(&self) -> SwarmResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.started {
            debug!("Browser pool already started");
            return Ok(());
        }

        let target = PREWARM_COUNT.min(self.config.max_browsers());
        info!("Pre-warming browser pool with {target} browsers");
        while inner.browsers.len() < target {
            let engine = self.launch().await?;
            let instance = BrowserInstance::new(engine, ResourceState::Available);
            inner.browsers.insert(instance.id.clone(), instance);
            inner.browsers_created += 1;
        }
        inner.started = true;
        Ok(())
    }

    /// Acquire a ready browser.
    ///
    /// Order of business, all under the pool lock: memory-pressure
    /// eviction, scan of AVAILABLE instances (recycling any that hit a
    /// threshold rather than handing them out), creation under the cap,
    /// and finally a capacity error. Never waits.
    ///
    /// # Errors
    ///
    /// `Capacity` when at `max_browsers` with nothing usable; `Creation`
    /// when a launch fails.
    pub async fn acquire(&self) -> SwarmResult<BrowserLease> {
        let mut inner = self.inner.lock().await;

        self.evict_for_memory_pressure(&mut inner).await;

        let available: Vec<String> = inner
            .browsers
            .values()
            .filter(|b| b.state == ResourceState::Available)
            .map(|b| b.id.clone())
            .collect();

        for id in available {
            let needs_recycle = inner.browsers.get(&id).is_some_and(|b| {
                self.policy
                    .browser_should_recycle(b.tasks_completed, b.errors, b.created_at.elapsed())
            });
            if needs_recycle {
                self.recycle_locked(&mut inner, &id).await;
                continue;
            }
            if let Some(browser) = inner.browsers.get_mut(&id) {
                browser.state = ResourceState::InUse;
                browser.last_used_at = Some(Instant::now());
                return Ok(BrowserLease {
                    id,
                    engine: Arc::clone(&browser.engine),
                });
            }
        }

        if inner.browsers.len() < self.config.max_browsers() {
            let engine = self.launch().await?;
            let instance = BrowserInstance::new(Arc::clone(&engine), ResourceState::InUse);
            let id = instance.id.clone();
            inner.browsers.insert(id.clone(), instance);
            inner.browsers_created += 1;
            debug!(
                "Launched browser {id} ({}/{})",
                inner.browsers.len(),
                self.config.max_browsers()
            );
            return Ok(BrowserLease { id, engine });
        }

        Err(SwarmError::Capacity {
            resource: "browser",
            limit: self.config.max_browsers(),
        })
    }

    /// Return a browser after an acquisition cycle.
    ///
    /// Bumps usage counters and either recycles (threshold reached) or
    /// flips the instance back to AVAILABLE. Releasing an id that is no
    /// longer pooled is a logged no-op: the instance was force-recycled
    /// while out.
    pub async fn release(&self, id: &str, had_error: bool) {
        let mut inner = self.inner.lock().await;

        let needs_recycle = match inner.browsers.get_mut(id) {
            Some(browser) => {
                browser.tasks_completed += 1;
                if had_error {
                    browser.errors += 1;
                }
                browser.last_used_at = Some(Instant::now());
                let recycle = self.policy.browser_should_recycle(
                    browser.tasks_completed,
                    browser.errors,
                    browser.created_at.elapsed(),
                );
                if !recycle {
                    browser.state = ResourceState::Available;
                }
                recycle
            }
            None => {
                debug!("Released browser {id} is no longer pooled; ignoring");
                return;
            }
        };

        if needs_recycle {
            self.recycle_locked(&mut inner, id).await;
        }
    }

    /// Record a context creation against a browser's counters.
    pub(crate) async fn note_context_created(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(browser) = inner.browsers.get_mut(id) {
            browser.contexts_created += 1;
        }
    }

    /// Close every browser regardless of state and clear the collection.
    ///
    /// Each close is bounded by `timeout`; close failures and timeouts are
    /// logged and swallowed. Idempotent.
    pub async fn stop(&self, timeout: Duration) {
        let mut inner = self.inner.lock().await;
        if !inner.browsers.is_empty() {
            info!("Stopping browser pool ({} browsers)", inner.browsers.len());
        }
        for (id, instance) in inner.browsers.drain() {
            match tokio::time::timeout(timeout, instance.engine.close()).await {
                Ok(Ok(())) => debug!("Closed browser {id}"),
                Ok(Err(e)) => warn!("Error closing browser {id} during stop: {e:#}"),
                Err(_) => warn!("Timed out closing browser {id} after {timeout:?}"),
            }
        }
        inner.started = false;
    }

    /// Point-in-time counters.
    pub async fn stats(&self) -> BrowserPoolStats {
        let inner = self.inner.lock().await;
        BrowserPoolStats {
            browsers_created: inner.browsers_created,
            browsers_recycled: inner.browsers_recycled,
            browsers_live: inner.browsers.len(),
            browsers_available: inner
                .browsers
                .values()
                .filter(|b| b.state == ResourceState::Available)
                .count(),
        }
    }

    async fn launch(&self) -> SwarmResult<Arc<dyn EngineHandle>> {
        let engine = (self.factory)()
            .await
            .map_err(|source| SwarmError::Creation {
                resource: "browser",
                source,
            })?;
        Ok(Arc::from(engine))
    }

    /// When over the memory ceiling, recycle the single oldest AVAILABLE
    /// browser. Best-effort: with nothing idle to evict, acquire proceeds.
    async fn evict_for_memory_pressure(&self, inner: &mut BrowserPoolInner) {
        let limit = self.config.memory_limit_mb();
        if limit == 0 {
            return;
        }
        let used = (self.memory_probe)();
        if used <= limit {
            return;
        }

        let oldest = inner
            .browsers
            .values()
            .filter(|b| b.state == ResourceState::Available)
            .min_by_key(|b| b.created_at)
            .map(|b| b.id.clone());

        match oldest {
            Some(id) => {
                info!("Memory pressure ({used} MiB > {limit} MiB): evicting oldest browser {id}");
                self.recycle_locked(inner, &id).await;
            }
            None => debug!("Memory pressure ({used} MiB > {limit} MiB) with nothing evictable"),
        }
    }

    /// Close and drop an instance. Close failures are logged and
    /// swallowed; the instance leaves the bookkeeping either way.
    async fn recycle_locked(&self, inner: &mut BrowserPoolInner, id: &str) {
        let Some(browser) = inner.browsers.get_mut(id) else {
            return;
        };
        browser.state = ResourceState::Recycling;
        let engine = Arc::clone(&browser.engine);
        if let Err(e) = engine.close().await {
            warn!("Error closing browser {id} during recycle: {e:#}");
        }
        if let Some(mut dead) = inner.browsers.remove(id) {
            dead.state = ResourceState::Dead;
        }
        inner.browsers_recycled += 1;
        debug!("Recycled browser {id}");
    }
}
