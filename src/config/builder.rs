//! Fluent builder for `SwarmConfig`
//!
//! Validates caps at build time so misconfiguration is caught before any
//! browser is launched rather than surfacing later as capacity errors.

use anyhow::{Result, bail};
use log::warn;

use super::types::SwarmConfig;

/// Default hard cap on browser processes
const DEFAULT_MAX_BROWSERS: usize = 10;

/// Default cap on contexts per browser
const DEFAULT_MAX_CONTEXTS_PER_BROWSER: usize = 10;

/// Default executor admission limit
const DEFAULT_MAX_CONCURRENT: usize = 50;

/// Default browser task threshold before recycling
const DEFAULT_BROWSER_MAX_TASKS: u64 = 100;

/// Default browser error threshold before recycling
const DEFAULT_BROWSER_MAX_ERRORS: u64 = 10;

/// Default browser age threshold before recycling (30 minutes)
const DEFAULT_BROWSER_MAX_AGE_SECS: u64 = 30 * 60;

/// Default context task threshold before recycling
const DEFAULT_CONTEXT_MAX_TASKS: u64 = 50;

pub struct SwarmConfigBuilder {
    max_browsers: usize,
    max_contexts_per_browser: usize,
    max_concurrent: usize,
    memory_limit_mb: u64,
    browser_max_tasks: u64,
    browser_max_errors: u64,
    browser_max_age_secs: u64,
    context_max_tasks: u64,
    headless: bool,
}

impl Default for SwarmConfigBuilder {
    fn default() -> Self {
        Self {
            max_browsers: DEFAULT_MAX_BROWSERS,
            max_contexts_per_browser: DEFAULT_MAX_CONTEXTS_PER_BROWSER,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            memory_limit_mb: 0,
            browser_max_tasks: DEFAULT_BROWSER_MAX_TASKS,
            browser_max_errors: DEFAULT_BROWSER_MAX_ERRORS,
            browser_max_age_secs: DEFAULT_BROWSER_MAX_AGE_SECS,
            context_max_tasks: DEFAULT_CONTEXT_MAX_TASKS,
            headless: true,
        }
    }
}

impl SwarmConfigBuilder {
    #[must_use]
    pub fn max_browsers(mut self, value: usize) -> Self {
        self.max_browsers = value;
        self
    }

    #[must_use]
    pub fn max_contexts_per_browser(mut self, value: usize) -> Self {
        self.max_contexts_per_browser = value;
        self
    }

    #[must_use]
    pub fn max_concurrent(mut self, value: usize) -> Self {
        self.max_concurrent = value;
        self
    }

    /// Process memory ceiling in MiB; 0 disables memory-pressure eviction.
    #[must_use]
    pub fn memory_limit_mb(mut self, value: u64) -> Self {
        self.memory_limit_mb = value;
        self
    }

    #[must_use]
    pub fn browser_max_tasks(mut self, value: u64) -> Self {
        self.browser_max_tasks = value;
        self
    }

    #[must_use]
    pub fn browser_max_errors(mut self, value: u64) -> Self {
        self.browser_max_errors = value;
        self
    }

    #[must_use]
    pub fn browser_max_age_secs(mut self, value: u64) -> Self {
        self.browser_max_age_secs = value;
        self
    }

    #[must_use]
    pub fn context_max_tasks(mut self, value: u64) -> Self {
        self.context_max_tasks = value;
        self
    }

    #[must_use]
    pub fn headless(mut self, value: bool) -> Self {
        self.headless = value;
        self
    }

    /// Build the configuration, validating all caps.
    ///
    /// # Errors
    ///
    /// Returns an error if any cap is zero. An oversubscribed
    /// `max_concurrent` (greater than `max_browsers *
    /// max_contexts_per_browser`) is legal but logged as a warning, since
    /// the overflow surfaces as capacity errors on `execute` instead of
    /// queuing.
    pub fn build(self) -> Result<SwarmConfig> {
        if self.max_browsers == 0 {
            bail!("max_browsers must be at least 1");
        }
        if self.max_contexts_per_browser == 0 {
            bail!("max_contexts_per_browser must be at least 1");
        }
        if self.max_concurrent == 0 {
            bail!("max_concurrent must be at least 1");
        }

        let session_capacity = self
            .max_browsers
            .saturating_mul(self.max_contexts_per_browser);
        if self.max_concurrent > session_capacity {
            warn!(
                "max_concurrent ({}) exceeds pool capacity ({} browsers x {} contexts = {}); \
                 excess tasks will fail with capacity errors instead of queuing",
                self.max_concurrent, self.max_browsers, self.max_contexts_per_browser,
                session_capacity
            );
        }

        Ok(self.build_unchecked())
    }

    /// Build without validation. Used by `SwarmConfig::default()` where the
    /// defaults are known-valid.
    pub(crate) fn build_unchecked(self) -> SwarmConfig {
        SwarmConfig {
            max_browsers: self.max_browsers,
            max_contexts_per_browser: self.max_contexts_per_browser,
            max_concurrent: self.max_concurrent,
            memory_limit_mb: self.memory_limit_mb,
            browser_max_tasks: self.browser_max_tasks,
            browser_max_errors: self.browser_max_errors,
            browser_max_age_secs: self.browser_max_age_secs,
            context_max_tasks: self.context_max_tasks,
            headless: self.headless,
        }
    }
}
