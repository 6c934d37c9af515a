//! Deployment error types

use pushapps_platform::PlatformError;
use pushapps_scheduler::SchedulerError;
use pushapps_types::Classify;
use thiserror::Error;

/// Deployment errors
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("Could not find space id for space {0}")]
    SpaceNotFound(String),

    #[error("Timed out after {minutes} minutes: {operation}")]
    Timeout { operation: String, minutes: u64 },

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl DeploymentError {
    /// Status code of the underlying platform failure
    pub fn platform_status(&self) -> Option<u16> {
        match self {
            DeploymentError::Platform(e) => e.status(),
            _ => None,
        }
    }
}

impl Classify for DeploymentError {
    fn is_transient(&self) -> bool {
        match self {
            DeploymentError::Platform(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Schema migration errors
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Unable to find migrations folder {0}")]
    MissingDirectory(String),

    #[error("Did not find any migrations in {0}")]
    NoMigrations(String),

    #[error("Invalid database port {0}")]
    InvalidPort(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migrate error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeploymentError>;
