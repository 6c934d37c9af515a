//! Phase orchestration
//!
//! Targets the configured organization and space, then runs the phases in
//! order: security groups, migrations, services, user-provided services and
//! applications. A required failure in any phase stops the run before the
//! next phase starts.

use crate::aggregate::{handle_results, RunSummary};
use crate::config::Config;
use crate::error::{PushAppsError, Result};
use pushapps_deployment::{
    AppDeployer, DatabaseMigrator, SchedulerSettings, SchemaMigrator, SecurityGroupCreator,
    ServiceCreator, SqlxMigrator, UserProvidedServiceCreator,
};
use pushapps_platform::PlatformClient;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// Deploys everything a [`Config`] declares
pub struct PushApps {
    config: Config,
    platform: Arc<dyn PlatformClient>,
    migrator: Arc<dyn SchemaMigrator>,
}

impl PushApps {
    /// Orchestrator using the `sqlx` migrator
    pub fn new(config: Config, platform: Arc<dyn PlatformClient>) -> Self {
        Self {
            config,
            platform,
            migrator: Arc::new(SqlxMigrator::new()),
        }
    }

    pub fn with_migrator(mut self, migrator: Arc<dyn SchemaMigrator>) -> Self {
        self.migrator = migrator;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[instrument(skip(self), fields(
        organization = %self.config.platform.organization,
        space = %self.config.platform.space,
    ))]
    pub async fn run(&self) -> Result<RunSummary> {
        self.target().await?;

        let settings = self.config.push_apps.scheduler_settings();
        let log_lines = self.config.push_apps.failed_deployment_log_lines_to_show;
        let mut summary = RunSummary::new();

        self.create_security_groups(settings, log_lines, &mut summary)
            .await?;
        self.run_migrations(settings, log_lines, &mut summary)
            .await?;
        let mut available = self.existing_services().await?;
        available.extend(
            self.create_services(settings, log_lines, &mut summary)
                .await?,
        );
        self.deploy_apps(settings, log_lines, available, &mut summary)
            .await?;

        info!(
            operations = summary.records().len(),
            optional_failures = summary.optional_failures().count(),
            "Deployment finished"
        );
        Ok(summary)
    }

    /// Create the organization and space when missing
    async fn target(&self) -> Result<()> {
        let organization = &self.config.platform.organization;
        let space = &self.config.platform.space;
        let targeting = |source| PushAppsError::Targeting {
            organization: organization.clone(),
            space: space.clone(),
            source,
        };

        let organizations = self.platform.list_organizations().await.map_err(targeting)?;
        if !organizations.contains(organization) {
            info!(organization = %organization, "Creating organization");
            self.platform
                .create_organization(organization)
                .await
                .map_err(targeting)?;
        }

        let spaces = self
            .platform
            .list_spaces(organization)
            .await
            .map_err(targeting)?;
        if !spaces.contains(space) {
            info!(organization = %organization, space = %space, "Creating space");
            self.platform
                .create_space(organization, space)
                .await
                .map_err(targeting)?;
        }

        info!(organization = %organization, space = %space, "Targeted space");
        Ok(())
    }

    async fn create_security_groups(
        &self,
        settings: SchedulerSettings,
        log_lines: usize,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if self.config.security_groups.is_empty() {
            return Ok(());
        }

        let results = SecurityGroupCreator::new(
            Arc::clone(&self.platform),
            settings,
            self.config.platform.organization.clone(),
            self.config.platform.space.clone(),
        )
        .create_security_groups(self.config.security_groups.clone())
        .await
        .map_err(PushAppsError::phase("Creating security groups"))?;

        handle_results("Create security group", results, log_lines, summary)?;
        Ok(())
    }

    async fn run_migrations(
        &self,
        settings: SchedulerSettings,
        log_lines: usize,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if self.config.migrations.is_empty() {
            return Ok(());
        }

        let results = DatabaseMigrator::new(
            Arc::clone(&self.migrator),
            settings,
            self.config.push_apps.migration_timeout_in_minutes,
        )
        .migrate(self.config.migrations.clone())
        .await
        .map_err(PushAppsError::phase("Migrating databases"))?;

        handle_results("Migrating database", results, log_lines, summary)?;
        Ok(())
    }

    /// Services present before this run touched any; instances left behind by
    /// failed creations are not bindable
    async fn existing_services(&self) -> Result<HashSet<String>> {
        if self.config.apps.is_empty() {
            return Ok(HashSet::new());
        }

        let existing = self
            .platform
            .list_services()
            .await
            .map_err(|e| PushAppsError::Phase {
                phase: "Listing services",
                source: e.into(),
            })?;
        Ok(existing.into_iter().collect())
    }

    /// Create services and user-provided services, returning the ones that
    /// succeeded
    async fn create_services(
        &self,
        settings: SchedulerSettings,
        log_lines: usize,
        summary: &mut RunSummary,
    ) -> Result<HashSet<String>> {
        let mut available: HashSet<String> = HashSet::new();

        if !self.config.services.is_empty() {
            let results = ServiceCreator::new(Arc::clone(&self.platform), settings)
                .create_services(self.config.services.clone())
                .await
                .map_err(PushAppsError::phase("Creating services"))?;
            let created = handle_results("Create service", results, log_lines, summary)?;
            available.extend(created.into_iter().map(|s| s.name));
        }

        if !self.config.user_provided_services.is_empty() {
            let results = UserProvidedServiceCreator::new(Arc::clone(&self.platform), settings)
                .create_services(self.config.user_provided_services.clone())
                .await
                .map_err(PushAppsError::phase("Creating user provided services"))?;
            let created =
                handle_results("Create user provided service", results, log_lines, summary)?;
            available.extend(created.into_iter().map(|s| s.name));
        }

        Ok(available)
    }

    async fn deploy_apps(
        &self,
        settings: SchedulerSettings,
        log_lines: usize,
        available: HashSet<String>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if self.config.apps.is_empty() {
            return Ok(());
        }

        let results = AppDeployer::new(Arc::clone(&self.platform), settings)
            .deploy(self.config.apps.clone(), available)
            .await
            .map_err(PushAppsError::phase("Deploying applications"))?;

        handle_results("Deploying application", results, log_lines, summary)?;
        Ok(())
    }
}
