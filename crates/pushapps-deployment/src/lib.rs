//! PushApps Deployment Engine
//!
//! Turns declared applications, services, security groups and migrations
//! into scheduled platform operations.
//!
//! ## Structure
//!
//! - `stage` / `pipeline`: the five-stage application pipeline
//!   (push, set environment, bind services, start, map route), each stage
//!   run through its own scheduler so retries and log capture apply per stage
//! - `strategies`: standard and blue-green executors
//! - `apps`, `services`, `security_groups`, `migration`: one entry point
//!   per deployment phase
//!
//! ## Usage
//!
//! ```no_run
//! use pushapps_deployment::{AppDeployer, SchedulerSettings};
//! use pushapps_platform::InMemoryPlatform;
//! use pushapps_types::AppConfig;
//! use std::collections::HashSet;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = Arc::new(InMemoryPlatform::new());
//! let deployer = AppDeployer::new(platform, SchedulerSettings::default());
//!
//! let apps = vec![AppConfig::new("foo", "build/foo.zip").with_blue_green()];
//! let results = deployer.deploy(apps, HashSet::new()).await?;
//! assert!(results.iter().all(|r| r.succeeded));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod apps;
pub mod context;
pub mod error;
pub mod logging;
pub mod migration;
pub mod pipeline;
pub mod security_groups;
pub mod services;
pub mod stage;
pub mod strategies;

pub use apps::AppDeployer;
pub use context::{DeploymentContext, SchedulerSettings};
pub use error::{DeploymentError, MigrationError, Result};
pub use logging::PlatformLogs;
pub use migration::{DatabaseMigrator, SchemaMigrator, SqlxMigrator};
pub use pipeline::{pipeline_stages, run_stages, StageOutcome};
pub use security_groups::SecurityGroupCreator;
pub use services::{ServiceCreator, UserProvidedServiceCreator};
pub use stage::{Stage, StageKind};
pub use strategies::{create_executor, BlueGreenDeploymentExecutor, DeploymentExecutor};

/// Result of one task in a deployment phase
pub type PhaseResult<C> = pushapps_types::OperationResult<C, DeploymentError>;
