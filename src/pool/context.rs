//! Browser context pool
//!
//! Multiplexes a capped number of isolated contexts per browser, layered
//! on `BrowserPool`. A context owns its top-level page; both are closed
//! only here. The pool reuses AVAILABLE contexts when a browser is
//! saturated and recycles independently of the hosting browser on usage
//! or task failure.
//!
//! Lock ordering: this pool never holds its own lock while calling into
//! `BrowserPool`. The browser is acquired first, and released (on every
//! path) only after the context lock has been dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ResourceState;
use super::browser::BrowserPool;
use super::recycling::RecyclingPolicy;
use crate::config::SwarmConfig;
use crate::engine::{ContextHandle, ContextOptions, PageHandle};
use crate::error::{SwarmError, SwarmResult};
use crate::stats::ContextPoolStats;

/// One pooled context bound to the browser that hosts it.
pub struct ContextInstance {
    pub id: String,
    /// Id reference to the hosting browser, not ownership. Valid at
    /// creation time; the context's state is independent afterwards.
    pub browser_id: String,
    context: Arc<dyn ContextHandle>,
    page: Arc<dyn PageHandle>,
    pub state: ResourceState,
    pub created_at: Instant,
    pub tasks_completed: u64,
    /// Correlation tags, opaque here.
    pub fingerprint_id: Option<String>,
    pub proxy_id: Option<String>,
    pub last_used_at: Option<Instant>,
}

/// What `acquire` hands out: ids for bookkeeping plus the page that the
/// caller's task runs against.
pub struct ContextLease {
    pub id: String,
    pub browser_id: String,
    pub page: Arc<dyn PageHandle>,
}

impl std::fmt::Debug for ContextLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLease")
            .field("id", &self.id)
            .field("browser_id", &self.browser_id)
            .finish()
    }
}

struct ContextPoolInner {
    contexts: HashMap<String, ContextInstance>,
    contexts_created: u64,
    contexts_recycled: u64,
    contexts_reused: u64,
}

/// Pool of browser contexts layered on `BrowserPool`.
pub struct ContextPool {
    config: SwarmConfig,
    policy: RecyclingPolicy,
    browsers: Arc<BrowserPool>,
    inner: Mutex<ContextPoolInner>,
}

impl ContextPool {
    #[must_use]
    pub fn new(config: SwarmConfig, browsers: Arc<BrowserPool>) -> Self {
        let policy = RecyclingPolicy::from_config(&config);
        Self {
            config,
            policy,
            browsers,
            inner: Mutex::new(ContextPoolInner {
                contexts: HashMap::new(),
                contexts_created: 0,
                contexts_recycled: 0,
                contexts_reused: 0,
            }),
        }
    }

    /// Acquire a context, creating one when its browser has spare capacity
    /// and reusing an AVAILABLE one when it does not.
    ///
    /// The hosting browser is acquired from `BrowserPool` for the duration
    /// of this call and released back on every path: after hosting a new
    /// context, after serving as the lookup vehicle for a reused one, and
    /// before a capacity error. Each cycle counts toward the browser's
    /// usage-based recycling.
    ///
    /// # Errors
    ///
    /// `Capacity` when the browser is saturated with nothing reusable (or
    /// the browser pool itself is at cap); `Creation` when the engine
    /// fails to produce a context/page pair, in which case the browser is
    /// released with its error budget charged.
    pub async fn acquire(
        &self,
        fingerprint: Option<&str>,
        proxy: Option<&str>,
    ) -> SwarmResult<ContextLease> {
        let lease = self.browsers.acquire().await?;

        let mut inner = self.inner.lock().await;

        let bound = inner
            .contexts
            .values()
            .filter(|c| c.browser_id == lease.id && c.state.is_live())
            .count();

        if bound < self.config.max_contexts_per_browser() {
            let created = async {
                let context = lease
                    .engine
                    .new_context(ContextOptions { fingerprint, proxy })
                    .await?;
                let page = context.new_page().await?;
                anyhow::Ok((context, page))
            }
            .await;

            return match created {
                Ok((context, page)) => {
                    let instance = ContextInstance {
                        id: Uuid::new_v4().to_string(),
                        browser_id: lease.id.clone(),
                        context: Arc::from(context),
                        page: Arc::from(page),
                        state: ResourceState::InUse,
                        created_at: Instant::now(),
                        tasks_completed: 0,
                        fingerprint_id: fingerprint.map(str::to_string),
                        proxy_id: proxy.map(str::to_string),
                        last_used_at: None,
                    };
                    let id = instance.id.clone();
                    let page = Arc::clone(&instance.page);
                    inner.contexts.insert(id.clone(), instance);
                    inner.contexts_created += 1;
                    drop(inner);

                    self.browsers.note_context_created(&lease.id).await;
                    self.browsers.release(&lease.id, false).await;
                    Ok(ContextLease {
                        id,
                        browser_id: lease.id,
                        page,
                    })
                }
                Err(source) => {
                    drop(inner);
                    // The half-built context is discarded; the failure
                    // counts against the browser's error budget.
                    self.browsers.release(&lease.id, true).await;
                    Err(SwarmError::Creation {
                        resource: "context",
                        source,
                    })
                }
            };
        }

        // Browser saturated: reuse an AVAILABLE context bound to it,
        // retiring any that hit their usage threshold along the way.
        let candidates: Vec<String> = inner
            .contexts
            .values()
            .filter(|c| c.browser_id == lease.id && c.state == ResourceState::Available)
            .map(|c| c.id.clone())
            .collect();

        for id in candidates {
            let needs_recycle = inner
                .contexts
                .get(&id)
                .is_some_and(|c| self.policy.context_should_recycle(c.tasks_completed, false));
            if needs_recycle {
                self.recycle_locked(&mut inner, &id).await;
                continue;
            }
            let reused_page = inner.contexts.get_mut(&id).map(|context| {
                context.state = ResourceState::InUse;
                context.last_used_at = Some(Instant::now());
                Arc::clone(&context.page)
            });
            if let Some(page) = reused_page {
                inner.contexts_reused += 1;
                drop(inner);

                // The browser was only the lookup vehicle here; it hosts
                // no new context and goes straight back to the pool even
                // though this context stays IN_USE.
                self.browsers.release(&lease.id, false).await;
                return Ok(ContextLease {
                    id,
                    browser_id: lease.id,
                    page,
                });
            }
        }

        drop(inner);
        self.browsers.release(&lease.id, false).await;
        Err(SwarmError::Capacity {
            resource: "context",
            limit: self.config.max_contexts_per_browser(),
        })
    }

    /// Return a context after a task.
    ///
    /// Resets the page to a blank state (best-effort, failures ignored),
    /// bumps counters, and recycles when the usage threshold is reached or
    /// the task reported an error; otherwise the context becomes AVAILABLE
    /// for reuse. Releasing an id that is no longer pooled is a logged
    /// no-op.
    pub async fn release(&self, id: &str, had_error: bool) {
        let mut inner = self.inner.lock().await;

        let needs_recycle = match inner.contexts.get_mut(id) {
            Some(context) => {
                if let Err(e) = context.page.reset().await {
                    debug!("Page reset failed for context {id}: {e:#}");
                }
                context.tasks_completed += 1;
                context.last_used_at = Some(Instant::now());
                let recycle = self
                    .policy
                    .context_should_recycle(context.tasks_completed, had_error);
                if !recycle {
                    context.state = ResourceState::Available;
                }
                recycle
            }
            None => {
                debug!("Released context {id} is no longer pooled; ignoring");
                return;
            }
        };

        if needs_recycle {
            self.recycle_locked(&mut inner, id).await;
        }
    }

    /// Recycle every context unconditionally. Shutdown path.
    pub async fn cleanup(&self) {
        let mut inner = self.inner.lock().await;
        let ids: Vec<String> = inner.contexts.keys().cloned().collect();
        if !ids.is_empty() {
            info!("Cleaning up {} contexts", ids.len());
        }
        for id in ids {
            self.recycle_locked(&mut inner, &id).await;
        }
    }

    /// Point-in-time counters.
    pub async fn stats(&self) -> ContextPoolStats {
        let inner = self.inner.lock().await;
        ContextPoolStats {
            contexts_created: inner.contexts_created,
            contexts_recycled: inner.contexts_recycled,
            contexts_reused: inner.contexts_reused,
            contexts_live: inner.contexts.len(),
            contexts_available: inner
                .contexts
                .values()
                .filter(|c| c.state == ResourceState::Available)
                .count(),
        }
    }

    /// Close page then context, drop the instance from bookkeeping. Close
    /// failures are logged and swallowed; they never block the path.
    async fn recycle_locked(&self, inner: &mut ContextPoolInner, id: &str) {
        let Some(context) = inner.contexts.get_mut(id) else {
            return;
        };
        context.state = ResourceState::Recycling;
        let page = Arc::clone(&context.page);
        let handle = Arc::clone(&context.context);
        if let Err(e) = page.close().await {
            debug!("Error closing page for context {id}: {e:#}");
        }
        if let Err(e) = handle.close().await {
            warn!("Error closing context {id} during recycle: {e:#}");
        }
        if let Some(mut dead) = inner.contexts.remove(id) {
            dead.state = ResourceState::Dead;
        }
        inner.contexts_recycled += 1;
        debug!("Recycled context {id}");
    }
}
