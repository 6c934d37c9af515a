//! PushApps Scheduler
//!
//! Drives a queue of deployment tasks against a remote platform with bounded
//! concurrency. Work is pulled in waves of at most `max_in_flight` items; a
//! wave settles completely (including requeues) before the next pull.
//!
//! ## Components
//!
//! - [`WorkQueue`]: shared FIFO the source drains and the scheduler requeues into
//! - [`DemandSource`]: pull-based producer with a one-shot end-of-stream
//! - [`RetryBudget`]: per-identifier remaining retries, owned by one run
//! - [`OperationScheduler`]: the consumer, classifying and retrying failures
//!
//! ## Usage
//!
//! ```no_run
//! use pushapps_scheduler::{operation_fn, OperationScheduler, WorkQueue};
//! # use pushapps_types::{Classify, OperationConfig};
//! # #[derive(Clone)] struct Task(String);
//! # impl OperationConfig for Task {
//! #     fn identifier(&self) -> &str { &self.0 }
//! #     fn optional(&self) -> bool { false }
//! # }
//! # #[derive(Debug)] struct Failed;
//! # impl std::fmt::Display for Failed {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "failed") }
//! # }
//! # impl Classify for Failed { fn is_transient(&self) -> bool { false } }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = WorkQueue::from_items(vec![Task("a".into()), Task("b".into())]);
//! let scheduler = OperationScheduler::builder(
//!     queue,
//!     operation_fn(|_task: Task| async move { Ok::<(), Failed>(()) }),
//! )
//! .max_in_flight(2)
//! .retries(3)
//! .description(|task: &Task| format!("Deploy {}", task.0))
//! .build()?;
//!
//! let report = scheduler.run().await?;
//! assert_eq!(report.results.len(), 2);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod budget;
pub mod error;
pub mod logs;
pub mod operation;
pub mod queue;
pub mod scheduler;
pub mod source;

pub use budget::RetryBudget;
pub use error::{Result, SchedulerError};
pub use logs::{LogSource, NoLogs};
pub use operation::{operation_fn, reporting_fn, Operation, Outcome};
pub use queue::WorkQueue;
pub use scheduler::{OperationScheduler, SchedulerBuilder, SchedulerReport};
pub use source::{Demand, DemandSource};
