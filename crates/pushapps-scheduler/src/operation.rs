//! Operations the scheduler invokes per task

use async_trait::async_trait;
use pushapps_types::OperationResult;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// What a successful attempt produced
#[derive(Debug)]
pub enum Outcome<C, E> {
    /// The scheduler records one successful result with the task's description
    Succeeded,
    /// The operation already built its results (zero or more)
    Reported(Vec<OperationResult<C, E>>),
}

/// A remote action applied to one task
///
/// Returning `Err` hands the failure to the scheduler's retry policy;
/// the task may be attempted again.
#[async_trait]
pub trait Operation<C, E>: Send + Sync {
    async fn run(&self, config: C) -> Result<Outcome<C, E>, E>;
}

/// Adapter for closures returning `Result<(), E>`
pub struct FnOperation<F, C, E> {
    f: F,
    _marker: PhantomData<fn(C) -> E>,
}

#[async_trait]
impl<F, Fut, C, E> Operation<C, E> for FnOperation<F, C, E>
where
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send,
    C: Send + 'static,
    E: Send + 'static,
{
    async fn run(&self, config: C) -> Result<Outcome<C, E>, E> {
        (self.f)(config).await?;
        Ok(Outcome::Succeeded)
    }
}

/// Adapter for closures that report their own results
pub struct ReportingFn<F, C, E> {
    f: F,
    _marker: PhantomData<fn(C) -> E>,
}

#[async_trait]
impl<F, Fut, C, E> Operation<C, E> for ReportingFn<F, C, E>
where
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<OperationResult<C, E>>, E>> + Send,
    C: Send + 'static,
    E: Send + 'static,
{
    async fn run(&self, config: C) -> Result<Outcome<C, E>, E> {
        Ok(Outcome::Reported((self.f)(config).await?))
    }
}

/// Wrap a closure as an operation producing a single result per task
pub fn operation_fn<F, Fut, C, E>(f: F) -> Arc<dyn Operation<C, E>>
where
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    Arc::new(FnOperation {
        f,
        _marker: PhantomData,
    })
}

/// Wrap a closure that builds its own results
pub fn reporting_fn<F, Fut, C, E>(f: F) -> Arc<dyn Operation<C, E>>
where
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<OperationResult<C, E>>, E>> + Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    Arc::new(ReportingFn {
        f,
        _marker: PhantomData,
    })
}
