//! Phase result handling
//!
//! Optional failures are logged and the phase carries on. The first required
//! failure is reported with its error chain and the newest recent log lines,
//! then aborts the run.

use crate::error::{PushAppsError, Result};
use pushapps_deployment::{DeploymentError, PhaseResult};
use pushapps_types::OperationConfig;
use std::error::Error as _;
use tracing::{error, warn};

/// One settled task of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub action: String,
    pub identifier: String,
    pub description: String,
    pub succeeded: bool,
    pub optional: bool,
    pub error: Option<String>,
}

/// Every settled task of a run, in settlement order
#[derive(Debug, Default)]
pub struct RunSummary {
    records: Vec<RunRecord>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.succeeded).count()
    }

    /// Optional tasks that failed without aborting the run
    pub fn optional_failures(&self) -> impl Iterator<Item = &RunRecord> {
        self.records.iter().filter(|r| !r.succeeded && r.optional)
    }

    fn push(&mut self, record: RunRecord) {
        self.records.push(record);
    }
}

/// Record `results` and return the configs that succeeded
///
/// Fails on the first required task that did not succeed. `log_lines` caps
/// the recent log lines printed for it.
pub fn handle_results<C: OperationConfig>(
    action: &str,
    results: Vec<PhaseResult<C>>,
    log_lines: usize,
    summary: &mut RunSummary,
) -> Result<Vec<C>> {
    let mut succeeded = Vec::with_capacity(results.len());

    for result in results {
        summary.push(RunRecord {
            action: action.to_string(),
            identifier: result.identifier().to_string(),
            description: result.description.clone(),
            succeeded: result.succeeded,
            optional: result.is_optional(),
            error: result.error.as_ref().map(ToString::to_string),
        });

        if result.succeeded {
            succeeded.push(result.config);
            continue;
        }

        if result.is_optional() {
            let message = result
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            warn!(
                "{action} {} was optional and failed with error message: {message}",
                result.description
            );
            continue;
        }

        report_failure(action, &result, log_lines);
        return Err(PushAppsError::OperationFailed {
            name: result.description,
            source: result.error,
        });
    }

    Ok(succeeded)
}

fn report_failure<C: OperationConfig>(action: &str, result: &PhaseResult<C>, log_lines: usize) {
    let messages = result.error.as_ref().map(error_messages).unwrap_or_default();
    error!(
        "{action} {} failed with error messages: [{}]",
        result.description,
        messages.join(", ")
    );

    let logs = result.newest_logs(log_lines);
    if logs.is_empty() {
        error!("Unable to fetch logs for failed operation {}", result.identifier());
        return;
    }

    error!(
        "Deployment of {} failed, printing the most recent {} log lines",
        result.identifier(),
        logs.len()
    );
    let lines: Vec<&str> = logs.iter().map(|line| line.message.as_str()).collect();
    error!("{}", lines.join("\n"));
}

/// The error, each nested cause, and the platform status code when known
pub fn error_messages(error: &DeploymentError) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut cause = error.source();
    while let Some(inner) = cause {
        messages.push(inner.to_string());
        cause = inner.source();
    }
    if let Some(status) = error.platform_status() {
        messages.push(format!("Platform responded with status code {status}"));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pushapps_platform::PlatformError;
    use pushapps_types::{LogLine, OperationResult, ServiceConfig};

    fn service(name: &str, optional: bool) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            plan: "small".to_string(),
            broker: "p-mysql".to_string(),
            optional,
        }
    }

    fn rejected() -> DeploymentError {
        DeploymentError::Platform(PlatformError::Api {
            status: 422,
            message: "plan not found".to_string(),
        })
    }

    #[test]
    fn test_successes_pass_through() {
        let mut summary = RunSummary::new();
        let results = vec![
            OperationResult::success("Creating service db", service("db", false)),
            OperationResult::success("Creating service cache", service("cache", false)),
        ];

        let succeeded = handle_results("Create service", results, 50, &mut summary).unwrap();

        assert_eq!(succeeded.len(), 2);
        assert_eq!(summary.succeeded(), 2);
    }

    #[test]
    fn test_optional_failure_does_not_abort() {
        let mut summary = RunSummary::new();
        let results = vec![
            OperationResult::failure("Creating service cache", service("cache", true), rejected()),
            OperationResult::success("Creating service db", service("db", false)),
        ];

        let succeeded = handle_results("Create service", results, 50, &mut summary).unwrap();

        assert_eq!(succeeded, vec![service("db", false)]);
        assert_eq!(summary.records().len(), 2);
        assert_eq!(summary.optional_failures().count(), 1);
    }

    #[test]
    fn test_required_failure_aborts() {
        let mut summary = RunSummary::new();
        let now = Utc::now();
        let failure = OperationResult::failure("Creating service db", service("db", false), rejected())
            .with_recent_logs(vec![
                LogLine::new(now - Duration::seconds(5), "older"),
                LogLine::new(now, "newest"),
            ]);
        let results = vec![failure, OperationResult::success("Creating service cache", service("cache", false))];

        let err = handle_results("Create service", results, 50, &mut summary).unwrap_err();

        assert_eq!(err.to_string(), "Non-optional operation Creating service db failed");
        assert!(matches!(
            err,
            PushAppsError::OperationFailed { source: Some(DeploymentError::Platform(_)), .. }
        ));
        assert_eq!(summary.records().len(), 1);
    }

    #[test]
    fn test_error_messages_follow_source_chain() {
        let messages = error_messages(&rejected());

        assert_eq!(messages.len(), 3);
        assert!(messages[0].starts_with("Platform error"));
        assert!(messages[1].contains("plan not found"));
        assert_eq!(messages[2], "Platform responded with status code 422");
    }
}
