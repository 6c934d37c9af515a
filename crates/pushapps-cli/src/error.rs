//! CLI error types

use pushapps_control::{ConfigError, PushAppsError};
use pushapps_platform::PlatformError;
use thiserror::Error;

/// Exit code for any failed run
pub const FAILURE_EXIT_CODE: i32 = 3;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unable to build platform client: {0}")]
    Client(#[from] PlatformError),

    #[error(transparent)]
    Run(#[from] PushAppsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
