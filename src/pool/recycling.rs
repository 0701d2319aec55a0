//! Usage and age based recycling policy
//!
//! Pure predicates over pooled-item counters. The pools consult these on
//! every acquire and release; the policy itself never touches state or
//! performs I/O, which keeps the thresholds independently testable.

use std::time::Duration;

use crate::config::SwarmConfig;

/// Thresholds deciding when a pooled item is retired
#[derive(Debug, Clone, Copy)]
pub struct RecyclingPolicy {
    /// Retire a browser after this many completed acquisition cycles.
    pub max_browser_tasks: u64,
    /// Retire a browser after this many recorded errors.
    pub max_browser_errors: u64,
    /// Retire a browser older than this.
    pub max_browser_age: Duration,
    /// Retire a context after this many completed tasks.
    pub max_context_tasks: u64,
}

impl RecyclingPolicy {
    #[must_use]
    pub fn from_config(config: &SwarmConfig) -> Self {
        Self {
            max_browser_tasks: config.browser_max_tasks(),
            max_browser_errors: config.browser_max_errors(),
            max_browser_age: config.browser_max_age(),
            max_context_tasks: config.context_max_tasks(),
        }
    }

    /// Whether a browser with the given counters should be recycled
    /// instead of handed out or kept.
    #[must_use]
    pub fn browser_should_recycle(&self, tasks_completed: u64, errors: u64, age: Duration) -> bool {
        tasks_completed >= self.max_browser_tasks
            || errors >= self.max_browser_errors
            || age >= self.max_browser_age
    }

    /// Whether a context should be recycled. An error reported by the
    /// releasing call always forces recycling regardless of usage.
    #[must_use]
    pub fn context_should_recycle(&self, tasks_completed: u64, had_error: bool) -> bool {
        had_error || tasks_completed >= self.max_context_tasks
    }
}

impl Default for RecyclingPolicy {
    fn default() -> Self {
        Self::from_config(&SwarmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> RecyclingPolicy {
        RecyclingPolicy {
            max_browser_tasks: 100,
            max_browser_errors: 10,
            max_browser_age: Duration::from_secs(1800),
            max_context_tasks: 50,
        }
    }

    #[test]
    fn test_browser_thresholds() {
        let p = policy();
        let young = Duration::from_secs(1);

        assert!(!p.browser_should_recycle(99, 0, young));
        assert!(p.browser_should_recycle(100, 0, young));
        assert!(!p.browser_should_recycle(0, 9, young));
        assert!(p.browser_should_recycle(0, 10, young));
        assert!(!p.browser_should_recycle(0, 0, Duration::from_secs(1799)));
        assert!(p.browser_should_recycle(0, 0, Duration::from_secs(1800)));
    }

    #[test]
    fn test_context_error_always_recycles() {
        let p = policy();
        assert!(p.context_should_recycle(0, true));
        assert!(!p.context_should_recycle(49, false));
        assert!(p.context_should_recycle(50, false));
    }

    proptest! {
        #[test]
        fn prop_browser_below_all_thresholds_survives(
            tasks in 0u64..100,
            errors in 0u64..10,
            age_secs in 0u64..1800,
        ) {
            prop_assert!(!policy().browser_should_recycle(
                tasks,
                errors,
                Duration::from_secs(age_secs),
            ));
        }

        #[test]
        fn prop_browser_any_threshold_recycles(
            tasks in 100u64..10_000,
            errors in 0u64..10,
        ) {
            prop_assert!(policy().browser_should_recycle(
                tasks,
                errors,
                Duration::from_secs(0),
            ));
        }

        #[test]
        fn prop_context_error_dominates(tasks in 0u64..10_000) {
            prop_assert!(policy().context_should_recycle(tasks, true));
        }
    }
}
