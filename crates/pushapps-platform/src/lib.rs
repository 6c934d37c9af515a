//! PushApps Platform
//!
//! The remote platform seen through one async trait, [`PlatformClient`].
//! Every call is scoped to the organization and space the client targets.
//!
//! Two implementations ship with the crate:
//!
//! - [`HttpPlatformClient`]: JSON over HTTP with basic auth
//! - [`InMemoryPlatform`]: development and testing, with scripted failures
//!
//! The client never retries on its own. Retries happen one level up, where
//! the scheduler requeues failed tasks.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;

pub use client::{PlatformClient, PushRequest, RouteSpec};
pub use config::PlatformConfig;
pub use error::{PlatformError, Result};
pub use http::HttpPlatformClient;
pub use memory::{ApplicationState, InMemoryPlatform, InjectedFailure, PlatformCall};
