//! Error types for pool and executor operations
//!
//! This module defines the error conditions that can occur while acquiring,
//! releasing, and recycling pooled browser resources, and while executing
//! tasks through the high-volume executor.

/// Error type shared by the pools and the executor
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    /// Pool is at its maximum size with nothing recyclable.
    ///
    /// Surfaced synchronously; the pools never block on capacity. Backpressure
    /// belongs to the executor's semaphore, not here.
    #[error("{resource} pool at capacity ({limit}), nothing recyclable")]
    Capacity {
        resource: &'static str,
        limit: usize,
    },

    /// Engine launch or context/page creation failed.
    ///
    /// The partially created item is discarded and never inserted.
    #[error("failed to create {resource}: {source:#}")]
    Creation {
        resource: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Failure while closing a resource during recycle or shutdown.
    ///
    /// Recycle and shutdown paths log and swallow this locally; it never
    /// blocks the path. The variant exists so adapters can report close
    /// failures with a kind instead of a bare string.
    #[error("failed to close {resource} {id}: {source:#}")]
    Close {
        resource: &'static str,
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// A caller-supplied task failed.
    ///
    /// Counted in `tasks_failed`, forwarded unchanged, and forces recycling
    /// of the context that served it.
    #[error("task failed: {0:#}")]
    Task(#[source] anyhow::Error),

    /// Executor is shutting down; no new work is admitted.
    #[error("executor stopped")]
    Cancelled,
}

impl SwarmError {
    /// Whether this error came from the caller's task rather than the pools.
    #[must_use]
    pub const fn is_task_error(&self) -> bool {
        matches!(self, Self::Task(_))
    }

    /// Whether this error is a fail-fast capacity rejection.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity { .. })
    }
}

/// Convenience alias for Result with `SwarmError`
pub type SwarmResult<T> = Result<T, SwarmError>;
