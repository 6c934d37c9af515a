//! # PushApps Control
//!
//! Loads the deployment configuration and drives every phase of a run.
//!
//! ## Key Components
//!
//! - [`Config`]: YAML configuration with run settings and declared tasks
//! - [`PushApps`]: Targets the organization and space, then runs security
//!   groups, migrations, services, user-provided services and applications
//! - [`handle_results`]: Optional failures warn, required failures abort
//!
//! ## Example
//!
//! ```rust,no_run
//! use pushapps_control::{Config, PushApps};
//! use pushapps_platform::InMemoryPlatform;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("pushapps.yml")?;
//! let summary = PushApps::new(config, Arc::new(InMemoryPlatform::new()))
//!     .run()
//!     .await?;
//! println!("{} operations succeeded", summary.succeeded());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod orchestrator;

pub use aggregate::{error_messages, handle_results, RunRecord, RunSummary};
pub use config::{Config, PushAppsSettings};
pub use error::{ConfigError, PushAppsError, Result};
pub use orchestrator::PushApps;
