//! Error types for configuration and orchestration

use pushapps_deployment::DeploymentError;
use pushapps_platform::PlatformError;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Duplicate entry {identifier} in {section}")]
    Duplicate { section: String, identifier: String },
}

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum PushAppsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Organization or space could not be targeted
    #[error("Unable to target {organization}/{space}: {source}")]
    Targeting {
        organization: String,
        space: String,
        #[source]
        source: PlatformError,
    },

    /// A phase could not run at all
    #[error("{phase} failed: {source}")]
    Phase {
        phase: &'static str,
        #[source]
        source: DeploymentError,
    },

    /// A required operation failed terminally
    #[error("Non-optional operation {name} failed")]
    OperationFailed {
        name: String,
        #[source]
        source: Option<DeploymentError>,
    },
}

impl PushAppsError {
    pub(crate) fn phase(phase: &'static str) -> impl FnOnce(DeploymentError) -> Self {
        move |source| PushAppsError::Phase { phase, source }
    }
}

/// Result type for orchestration
pub type Result<T> = std::result::Result<T, PushAppsError>;
