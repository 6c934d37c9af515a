//! Platform error types

use pushapps_types::Classify;
use thiserror::Error;

/// Errors returned by platform clients
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 5xx or unknown status; the platform itself is struggling
    #[error("Platform unavailable: {status} - {message}")]
    Unavailable { status: u16, message: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid platform configuration: {0}")]
    InvalidConfig(String),

    #[error("Unable to read artifact {path}: {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PlatformError {
    /// Status code reported by the platform, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            PlatformError::Unavailable { status, .. } | PlatformError::Api { status, .. } => {
                Some(*status)
            }
            PlatformError::Http(e) => e.status().map(|s| s.as_u16()),
            PlatformError::NotFound(_) => Some(404),
            PlatformError::Conflict(_) => Some(409),
            _ => None,
        }
    }
}

impl Classify for PlatformError {
    fn is_transient(&self) -> bool {
        matches!(self, PlatformError::Unavailable { .. })
    }
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
