//! Standard in-place deployment

use super::executor::DeploymentExecutor;
use crate::context::DeploymentContext;
use crate::error::Result;
use crate::pipeline::{pipeline_stages, run_stages};
use crate::PhaseResult;
use async_trait::async_trait;
use pushapps_types::AppConfig;
use std::sync::Arc;
use tracing::info;

/// Runs the five-stage pipeline directly against the application
pub struct StandardDeploymentExecutor;

#[async_trait]
impl DeploymentExecutor for StandardDeploymentExecutor {
    async fn execute(
        &self,
        app: &AppConfig,
        ctx: &Arc<DeploymentContext>,
    ) -> Result<Vec<PhaseResult<AppConfig>>> {
        info!(app = %app.name, "Deploying application");
        let outcome = run_stages(pipeline_stages(app), ctx).await?;
        Ok(outcome.results)
    }

    fn name(&self) -> &str {
        "standard"
    }
}
