//! Sequential stage runner
//!
//! Each stage goes through its own single-task scheduler, so stage-level
//! retries, failure classification and diagnostic log capture match every
//! other phase. The first terminal failure stops the remaining stages.

use crate::context::DeploymentContext;
use crate::error::Result;
use crate::logging::PlatformLogs;
use crate::stage::{Stage, StageKind};
use crate::PhaseResult;
use pushapps_scheduler::{operation_fn, OperationScheduler, WorkQueue};
use pushapps_types::AppConfig;
use std::sync::Arc;
use tracing::warn;

/// Results of a run of stages
#[derive(Debug)]
pub struct StageOutcome {
    /// One result per stage that ran, reported against each stage's owner
    pub results: Vec<PhaseResult<AppConfig>>,
    /// `false` when a stage failed terminally and later stages were skipped
    pub completed: bool,
}

/// The five pipeline stages for `app`, in order
pub fn pipeline_stages(app: &AppConfig) -> Vec<Stage> {
    [
        StageKind::Push,
        StageKind::SetEnvironment,
        StageKind::BindServices,
        StageKind::Start,
        StageKind::MapRoute,
    ]
    .into_iter()
    .map(|kind| Stage::new(kind, app))
    .collect()
}

/// Run `stages` one after another, stopping at the first terminal failure
pub async fn run_stages(stages: Vec<Stage>, ctx: &Arc<DeploymentContext>) -> Result<StageOutcome> {
    let settings = ctx.settings();
    let mut results = Vec::with_capacity(stages.len());

    for stage in stages {
        let description = stage.description();
        let stage_ctx = Arc::clone(ctx);
        let operation = operation_fn(move |stage: Stage| {
            let ctx = Arc::clone(&stage_ctx);
            async move { stage.perform(&ctx).await }
        });

        let report = OperationScheduler::builder(WorkQueue::from_items([stage]), operation)
            .action(description)
            .max_in_flight(1)
            .retries(settings.retries)
            .description(Stage::description)
            .log_source(Arc::new(PlatformLogs::new(Arc::clone(ctx.platform()))))
            .build()?
            .run()
            .await?;

        let mut failed = false;
        for result in report.results {
            if !result.succeeded {
                warn!(stage = %result.description, "Stage failed, skipping remaining stages");
                failed = true;
            }
            results.push(result.map_config(|stage| stage.owner));
        }

        if failed {
            return Ok(StageOutcome {
                results,
                completed: false,
            });
        }
    }

    Ok(StageOutcome {
        results,
        completed: true,
    })
}
