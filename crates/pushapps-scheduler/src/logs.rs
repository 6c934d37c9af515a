//! Diagnostic log sources

use async_trait::async_trait;
use pushapps_types::LogLine;

/// Fetches recent log lines for a task that failed terminally
///
/// Implementations swallow their own failures and return an empty list; a
/// missing log must never hide the task's error.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn recent_logs(&self, identifier: &str) -> Vec<LogLine>;
}

/// Log source for phases without application logs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogs;

#[async_trait]
impl LogSource for NoLogs {
    async fn recent_logs(&self, _identifier: &str) -> Vec<LogLine> {
        Vec::new()
    }
}
