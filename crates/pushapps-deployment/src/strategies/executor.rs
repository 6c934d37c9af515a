//! Deployment executor trait

use crate::context::DeploymentContext;
use crate::error::Result;
use crate::PhaseResult;
use async_trait::async_trait;
use pushapps_types::AppConfig;
use std::sync::Arc;

/// Deploys one application and reports a result per stage it ran
///
/// Stage failures are reported as failed results, not as `Err`. An `Err`
/// means the stages could not be scheduled at all.
#[async_trait]
pub trait DeploymentExecutor: Send + Sync {
    async fn execute(
        &self,
        app: &AppConfig,
        ctx: &Arc<DeploymentContext>,
    ) -> Result<Vec<PhaseResult<AppConfig>>>;

    /// Strategy name
    fn name(&self) -> &str;
}
