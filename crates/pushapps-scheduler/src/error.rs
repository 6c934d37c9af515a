//! Scheduler error types
//!
//! Individual task failures never surface here; they become terminal
//! `OperationResult`s. These errors abort the whole run.

use thiserror::Error;

/// Scheduler-fatal errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("max in flight must be positive")]
    InvalidMaxInFlight,

    #[error("Operation task aborted: {0}")]
    TaskAborted(#[from] tokio::task::JoinError),

    #[error("Concurrency limiter closed")]
    LimiterClosed,
}

/// Result type for scheduler runs
pub type Result<T> = std::result::Result<T, SchedulerError>;
