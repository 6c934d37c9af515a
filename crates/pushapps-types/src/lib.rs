//! PushApps Types - Core types shared by every deployment phase
//!
//! PushApps deploys a declared set of applications, services, database
//! schemas and security groups onto a multi-tenant platform. Each of those
//! declarations is a task that the scheduler drives to completion.
//!
//! ## Key Concepts
//!
//! - **OperationConfig**: Capability set every schedulable task implements
//! - **OperationResult**: Final outcome of one task, including diagnostic logs
//! - **LogLine**: A single recent log line fetched for a failed application
//! - **Task configs**: `AppConfig`, `ServiceConfig`, `UserProvidedServiceConfig`,
//!   `Migration`, `SecurityGroup`

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod app;
pub mod migration;
pub mod operation;
pub mod security_group;
pub mod service;

pub use app::{AppConfig, RouteConfig, SizeParseError};
pub use migration::{DatabaseDriver, Migration};
pub use operation::{Classify, LogLine, OperationConfig, OperationResult};
pub use security_group::SecurityGroup;
pub use service::{ServiceConfig, UserProvidedServiceConfig};
