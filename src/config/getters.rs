//! Getter methods for `SwarmConfig`
//!
//! Accessor methods for retrieving configuration values from a
//! `SwarmConfig` instance.

use std::time::Duration;

use super::types::SwarmConfig;

impl SwarmConfig {
    #[must_use]
    pub fn max_browsers(&self) -> usize {
        self.max_browsers
    }

    #[must_use]
    pub fn max_contexts_per_browser(&self) -> usize {
        self.max_contexts_per_browser
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    #[must_use]
    pub fn memory_limit_mb(&self) -> u64 {
        self.memory_limit_mb
    }

    #[must_use]
    pub fn browser_max_tasks(&self) -> u64 {
        self.browser_max_tasks
    }

    #[must_use]
    pub fn browser_max_errors(&self) -> u64 {
        self.browser_max_errors
    }

    #[must_use]
    pub fn browser_max_age(&self) -> Duration {
        Duration::from_secs(self.browser_max_age_secs)
    }

    #[must_use]
    pub fn context_max_tasks(&self) -> u64 {
        self.context_max_tasks
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }
}
