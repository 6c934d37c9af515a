//! Operation scheduler
//!
//! Consumer side of the demand protocol. Each wave pulls up to
//! `max_in_flight` tasks and dispatches each one holding a permit of a
//! semaphore sized `max_in_flight`. A wave ends once the semaphore is fully
//! released, so requeues made during a wave land in the queue before the
//! next emptiness check.

use crate::budget::RetryBudget;
use crate::error::{Result, SchedulerError};
use crate::logs::{LogSource, NoLogs};
use crate::operation::{Operation, Outcome};
use crate::queue::WorkQueue;
use crate::source::{Demand, DemandSource};
use pushapps_types::{Classify, OperationConfig, OperationResult};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

type Projector<C> = Arc<dyn Fn(&C) -> String + Send + Sync>;

/// Everything a run produced
#[derive(Debug)]
pub struct SchedulerReport<C, E> {
    /// Final results in settlement order
    pub results: Vec<OperationResult<C, E>>,

    /// Number of items delivered per wave
    pub waves: Vec<usize>,

    /// Every demand issued to the source, including the final one
    pub demands: Vec<usize>,
}

impl<C, E> SchedulerReport<C, E> {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.succeeded)
    }
}

/// Builder for [`OperationScheduler`]
pub struct SchedulerBuilder<C, E> {
    queue: WorkQueue<C>,
    operation: Arc<dyn Operation<C, E>>,
    action: String,
    max_in_flight: usize,
    retries: u32,
    identifier: Option<Projector<C>>,
    description: Option<Projector<C>>,
    log_source: Arc<dyn LogSource>,
}

impl<C, E> SchedulerBuilder<C, E>
where
    C: OperationConfig,
    E: Classify + Display + Send + 'static,
{
    /// Label used in log output, e.g. `Deploying applications`
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Retries allowed per identifier for non-transient failures
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn identifier(mut self, f: impl Fn(&C) -> String + Send + Sync + 'static) -> Self {
        self.identifier = Some(Arc::new(f));
        self
    }

    pub fn description(mut self, f: impl Fn(&C) -> String + Send + Sync + 'static) -> Self {
        self.description = Some(Arc::new(f));
        self
    }

    pub fn log_source(mut self, source: Arc<dyn LogSource>) -> Self {
        self.log_source = source;
        self
    }

    pub fn build(self) -> Result<OperationScheduler<C, E>> {
        if self.max_in_flight == 0 {
            return Err(SchedulerError::InvalidMaxInFlight);
        }

        let identifier: Projector<C> = match self.identifier {
            Some(f) => f,
            None => Arc::new(|c: &C| c.identifier().to_string()),
        };
        let description: Projector<C> = match self.description {
            Some(f) => f,
            None => Arc::clone(&identifier),
        };

        Ok(OperationScheduler {
            max_in_flight: self.max_in_flight,
            attempt: Arc::new(Attempt {
                operation: self.operation,
                identifier,
                description,
                queue: self.queue.clone(),
                budget: RetryBudget::new(self.retries),
                log_source: self.log_source,
            }),
            queue: self.queue,
            action: self.action,
        })
    }
}

/// Runs a queue of tasks to completion with bounded concurrency
pub struct OperationScheduler<C, E> {
    max_in_flight: usize,
    queue: WorkQueue<C>,
    attempt: Arc<Attempt<C, E>>,
    action: String,
}

impl<C, E> OperationScheduler<C, E>
where
    C: OperationConfig,
    E: Classify + Display + Send + 'static,
{
    pub fn builder(
        queue: WorkQueue<C>,
        operation: Arc<dyn Operation<C, E>>,
    ) -> SchedulerBuilder<C, E> {
        SchedulerBuilder {
            queue,
            operation,
            action: "Running operations".to_string(),
            max_in_flight: 2,
            retries: 0,
            identifier: None,
            description: None,
            log_source: Arc::new(NoLogs),
        }
    }

    /// Drain the queue. Results are delivered once, after the last wave.
    #[instrument(skip(self), fields(action = %self.action, max_in_flight = self.max_in_flight))]
    pub async fn run(self) -> Result<SchedulerReport<C, E>> {
        let limiter = Arc::new(Semaphore::new(self.max_in_flight));
        let capacity =
            u32::try_from(self.max_in_flight).map_err(|_| SchedulerError::InvalidMaxInFlight)?;
        let mut source = DemandSource::new(self.queue.clone());
        let mut results = Vec::new();
        let mut waves = Vec::new();

        loop {
            let items = match source.on_demand(self.max_in_flight).await {
                Demand::Items(items) => items,
                Demand::EndOfStream => break,
            };
            waves.push(items.len());
            debug!(wave = waves.len(), size = items.len(), "Dispatching wave");

            let mut wave = JoinSet::new();
            for item in items {
                let permit = Arc::clone(&limiter)
                    .acquire_owned()
                    .await
                    .map_err(|_| SchedulerError::LimiterClosed)?;
                let attempt = Arc::clone(&self.attempt);

                wave.spawn(async move {
                    let settled = attempt.run(item).await;
                    drop(permit);
                    settled
                });
            }

            // Wave barrier: every permit back
            let released = limiter
                .acquire_many(capacity)
                .await
                .map_err(|_| SchedulerError::LimiterClosed)?;
            drop(released);

            while let Some(joined) = wave.join_next().await {
                match joined {
                    Ok(settled) => results.extend(settled),
                    Err(e) => {
                        error!(error = %e, "Operation task aborted");
                        return Err(SchedulerError::TaskAborted(e));
                    }
                }
            }
        }

        info!(
            results = results.len(),
            waves = waves.len(),
            "{} complete",
            self.action
        );

        Ok(SchedulerReport {
            results,
            waves,
            demands: source.requests().to_vec(),
        })
    }
}

/// One attempt at one task, plus the policy applied to its failure
struct Attempt<C, E> {
    operation: Arc<dyn Operation<C, E>>,
    identifier: Projector<C>,
    description: Projector<C>,
    queue: WorkQueue<C>,
    budget: RetryBudget,
    log_source: Arc<dyn LogSource>,
}

impl<C, E> Attempt<C, E>
where
    C: OperationConfig,
    E: Classify + Display + Send + 'static,
{
    async fn run(&self, config: C) -> Vec<OperationResult<C, E>> {
        let identifier = (self.identifier)(&config);

        match self.operation.run(config.clone()).await {
            Ok(Outcome::Succeeded) => {
                vec![OperationResult::success((self.description)(&config), config)]
            }
            Ok(Outcome::Reported(results)) => results,
            Err(e) if e.is_transient() => {
                warn!(task = %identifier, error = %e, "Platform unavailable, requeueing");
                self.queue.push(config).await;
                Vec::new()
            }
            Err(e) if self.budget.try_consume(&identifier) => {
                warn!(
                    task = %identifier,
                    error = %e,
                    remaining = self.budget.remaining(&identifier).unwrap_or(0),
                    "Operation failed, retrying"
                );
                self.queue.push(config).await;
                Vec::new()
            }
            Err(e) => {
                let logs = self.log_source.recent_logs(&identifier).await;
                vec![OperationResult::failure((self.description)(&config), config, e)
                    .with_recent_logs(logs)]
            }
        }
    }
}
