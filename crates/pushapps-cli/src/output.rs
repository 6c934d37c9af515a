//! Output formatting utilities

use crate::error::CliResult;
use colored::*;
use pushapps_control::{RunRecord, RunSummary};
use serde::Serialize;
use std::error::Error;
use tabled::{Table, Tabled};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// One settled operation
#[derive(Debug, Serialize, Tabled)]
pub struct OperationRow {
    #[tabled(rename = "Phase")]
    pub action: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Operation")]
    pub description: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&RunRecord> for OperationRow {
    fn from(record: &RunRecord) -> Self {
        let status = match (record.succeeded, record.optional) {
            (true, _) => "ok",
            (false, true) => "failed (optional)",
            (false, false) => "failed",
        };
        Self {
            action: record.action.clone(),
            name: record.identifier.clone(),
            description: record.description.clone(),
            status: status.to_string(),
        }
    }
}

/// Print every settled operation of a run
pub fn print_summary(summary: &RunSummary, format: OutputFormat) -> CliResult<()> {
    let rows: Vec<OperationRow> = summary.records().iter().map(OperationRow::from).collect();
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "Nothing to deploy".dimmed());
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an error and every nested cause
pub fn print_error(error: &dyn Error) {
    eprintln!("{} {}", "✗".red(), error);
    let mut cause = error.source();
    while let Some(inner) = cause {
        eprintln!("  caused by: {inner}");
        cause = inner.source();
    }
}
