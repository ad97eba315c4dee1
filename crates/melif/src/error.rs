//! Error taxonomy shared by every module of the crate.
//!
//! Geometric and configuration errors are raised immediately (fail fast).
//! Scheduler task failures are isolated per task; `RunStats` collects them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MelifError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MelifError {
    /// Degenerate, negative or zero-norm coordinates.
    #[error("invalid point: {0}")]
    InvalidPoint(String),

    /// Cut size above feature count, unsupported dimensionality, shape mismatch.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// `take()` saw no task within the starvation window.
    #[error("no task became available within {waited_ms} ms")]
    Starvation { waited_ms: u128 },

    /// A recomputed cut disagrees with the cached one for the same key.
    #[error("cache inconsistency at {key}: cached {cached}, recomputed {recomputed}")]
    CacheInconsistency {
        key: String,
        cached: String,
        recomputed: String,
    },

    #[error("queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl MelifError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    pub(crate) fn point(reason: impl Into<String>) -> Self {
        Self::InvalidPoint(reason.into())
    }
}
