//! Operation capability set and result types
//!
//! Every task handed to the scheduler implements [`OperationConfig`]. The
//! scheduler surfaces exactly one [`OperationResult`] per task outcome that is
//! neither retried nor requeued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability set of a schedulable task
pub trait OperationConfig: Clone + Send + Sync + 'static {
    /// Identifier, unique within one queue and stable across requeues
    fn identifier(&self) -> &str;

    /// Whether a terminal failure of this task is downgraded to a warning
    fn optional(&self) -> bool;
}

/// Failure classification used when deciding whether to retry
pub trait Classify {
    /// Whether the failure is an infrastructure hiccup (upstream 5xx,
    /// unknown status) rather than a problem with the task itself.
    /// Transient failures are requeued without charging the retry budget.
    fn is_transient(&self) -> bool;
}

/// A recent log line fetched from the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// When the platform recorded the line
    pub timestamp: DateTime<Utc>,

    /// Log message
    pub message: String,
}

impl LogLine {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}

/// Final outcome of one task
#[derive(Debug)]
pub struct OperationResult<C, E> {
    /// Human-readable label of the operation
    pub description: String,

    /// Task the result belongs to
    pub config: C,

    /// Whether the operation succeeded
    pub succeeded: bool,

    /// Failure detail for terminal failures
    pub error: Option<E>,

    /// Recent log lines, populated only for terminal failures
    pub recent_logs: Vec<LogLine>,
}

impl<C, E> OperationResult<C, E> {
    /// Successful outcome
    pub fn success(description: impl Into<String>, config: C) -> Self {
        Self {
            description: description.into(),
            config,
            succeeded: true,
            error: None,
            recent_logs: Vec::new(),
        }
    }

    /// Terminal failure
    pub fn failure(description: impl Into<String>, config: C, error: E) -> Self {
        Self {
            description: description.into(),
            config,
            succeeded: false,
            error: Some(error),
            recent_logs: Vec::new(),
        }
    }

    pub fn with_recent_logs(mut self, logs: Vec<LogLine>) -> Self {
        self.recent_logs = logs;
        self
    }

    /// Replace the owning config, keeping the outcome
    pub fn map_config<D>(self, f: impl FnOnce(C) -> D) -> OperationResult<D, E> {
        OperationResult {
            description: self.description,
            config: f(self.config),
            succeeded: self.succeeded,
            error: self.error,
            recent_logs: self.recent_logs,
        }
    }

    /// Recent logs ordered newest first, capped at `limit` lines
    pub fn newest_logs(&self, limit: usize) -> Vec<&LogLine> {
        let mut logs: Vec<&LogLine> = self.recent_logs.iter().collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        logs.truncate(limit.min(self.recent_logs.len()));
        logs
    }
}

impl<C: OperationConfig, E> OperationResult<C, E> {
    pub fn identifier(&self) -> &str {
        self.config.identifier()
    }

    pub fn is_optional(&self) -> bool {
        self.config.optional()
    }
}
