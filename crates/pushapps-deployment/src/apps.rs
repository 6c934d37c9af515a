//! Application phase

use crate::context::{DeploymentContext, SchedulerSettings};
use crate::error::Result;
use crate::logging::PlatformLogs;
use crate::strategies::create_executor;
use crate::PhaseResult;
use pushapps_platform::PlatformClient;
use pushapps_scheduler::{reporting_fn, OperationScheduler, WorkQueue};
use pushapps_types::AppConfig;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// Deploys every application concurrently, each through its strategy
pub struct AppDeployer {
    platform: Arc<dyn PlatformClient>,
    settings: SchedulerSettings,
}

impl AppDeployer {
    pub fn new(platform: Arc<dyn PlatformClient>, settings: SchedulerSettings) -> Self {
        Self { platform, settings }
    }

    /// Deploy `apps`, binding only services in `available_services`
    #[instrument(skip_all, fields(apps = apps.len()))]
    pub async fn deploy(
        &self,
        apps: Vec<AppConfig>,
        available_services: HashSet<String>,
    ) -> Result<Vec<PhaseResult<AppConfig>>> {
        let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
        info!("Deploying applications: {}", names.join(", "));

        let stacks = self.platform.list_stacks().await?;
        let existing = self.platform.list_applications().await?;
        let ctx = Arc::new(DeploymentContext::new(
            Arc::clone(&self.platform),
            available_services,
            stacks,
            existing.into_iter().collect(),
            self.settings,
        ));

        let operation = reporting_fn(move |app: AppConfig| {
            let ctx = Arc::clone(&ctx);
            async move { create_executor(&app).execute(&app, &ctx).await }
        });

        // Stage schedulers own the retry budget
        let report = OperationScheduler::builder(WorkQueue::from_items(apps), operation)
            .action("Deploying applications")
            .max_in_flight(self.settings.max_in_flight)
            .retries(0)
            .description(|app: &AppConfig| format!("Push application {}", app.name))
            .log_source(Arc::new(PlatformLogs::new(Arc::clone(&self.platform))))
            .build()?
            .run()
            .await?;

        Ok(report.results)
    }
}
