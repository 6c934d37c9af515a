//! Security group phase

use crate::context::SchedulerSettings;
use crate::error::{DeploymentError, Result};
use crate::logging::logged;
use crate::PhaseResult;
use pushapps_platform::{PlatformClient, PlatformError};
use pushapps_scheduler::{operation_fn, OperationScheduler, WorkQueue};
use pushapps_types::SecurityGroup;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const NAME_TAKEN: &str = "name is taken";

/// Creates security groups and binds them to the target space
pub struct SecurityGroupCreator {
    platform: Arc<dyn PlatformClient>,
    settings: SchedulerSettings,
    organization: String,
    space: String,
}

impl SecurityGroupCreator {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        settings: SchedulerSettings,
        organization: impl Into<String>,
        space: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            settings,
            organization: organization.into(),
            space: space.into(),
        }
    }

    /// Create every group; a group whose name is already taken counts as created
    #[instrument(skip_all, fields(space = %self.space, groups = groups.len()))]
    pub async fn create_security_groups(
        &self,
        groups: Vec<SecurityGroup>,
    ) -> Result<Vec<PhaseResult<SecurityGroup>>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let space_id = self
            .platform
            .space_id(&self.organization, &self.space)
            .await?
            .ok_or_else(|| DeploymentError::SpaceNotFound(self.space.clone()))?;

        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        info!("Creating security groups: {}", names.join(", "));

        let platform = Arc::clone(&self.platform);
        let space_id = Arc::new(space_id);
        let operation = operation_fn(move |group: SecurityGroup| {
            let platform = Arc::clone(&platform);
            let space_id = Arc::clone(&space_id);
            async move {
                let description = create_description(&group);
                logged(&description, async {
                    match platform.create_security_group(&group, &space_id).await {
                        Err(PlatformError::Conflict(message)) if message.contains(NAME_TAKEN) => {
                            debug!(group = %group.name, "Security group already exists");
                            Ok(())
                        }
                        other => other.map_err(DeploymentError::from),
                    }
                })
                .await
            }
        });

        let report = OperationScheduler::builder(WorkQueue::from_items(groups), operation)
            .action("Creating security groups")
            .max_in_flight(self.settings.max_in_flight)
            .retries(self.settings.retries)
            .description(create_description)
            .build()?
            .run()
            .await?;

        Ok(report.results)
    }
}

fn create_description(group: &SecurityGroup) -> String {
    format!("Creating security group {}", group.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushapps_platform::{InMemoryPlatform, InjectedFailure};

    fn group(name: &str) -> SecurityGroup {
        SecurityGroup {
            name: name.to_string(),
            destination: "10.0.0.0/16".to_string(),
            protocol: "tcp".to_string(),
            optional: false,
        }
    }

    fn creator(platform: &Arc<InMemoryPlatform>) -> SecurityGroupCreator {
        SecurityGroupCreator::new(
            Arc::clone(platform) as Arc<dyn PlatformClient>,
            SchedulerSettings {
                max_in_flight: 2,
                retries: 0,
            },
            "dev",
            "apps",
        )
    }

    #[tokio::test]
    async fn test_groups_bound_to_space() {
        let platform = Arc::new(InMemoryPlatform::new().with_space("dev", "apps"));
        let space_id = platform.space_id("dev", "apps").await.unwrap().unwrap();

        let results = creator(&platform)
            .create_security_groups(vec![group("internal"), group("database")])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.succeeded));
        assert_eq!(platform.security_group_space("internal"), Some(space_id.clone()));
        assert_eq!(platform.security_group_space("database"), Some(space_id));
    }

    #[tokio::test]
    async fn test_taken_name_counts_as_success() {
        let platform = Arc::new(InMemoryPlatform::new().with_space("dev", "apps"));
        let creator = creator(&platform);

        creator.create_security_groups(vec![group("internal")]).await.unwrap();
        let results = creator.create_security_groups(vec![group("internal")]).await.unwrap();

        assert!(results[0].succeeded);
        assert_eq!(results[0].description, "Creating security group internal");
    }

    #[tokio::test]
    async fn test_missing_space_is_an_error() {
        let platform = Arc::new(InMemoryPlatform::new().with_space("dev", "other"));

        let err = creator(&platform)
            .create_security_groups(vec![group("internal")])
            .await
            .unwrap_err();

        assert!(matches!(err, DeploymentError::SpaceNotFound(ref space) if space == "apps"));
        assert_eq!(err.to_string(), "Could not find space id for space apps");
    }

    #[tokio::test]
    async fn test_rejected_group_is_reported() {
        let platform = Arc::new(InMemoryPlatform::new().with_space("dev", "apps"));
        platform.fail_always("create_security_group", "internal", InjectedFailure::Rejected);

        let results = creator(&platform)
            .create_security_groups(vec![group("internal"), group("database")])
            .await
            .unwrap();

        let failed: Vec<_> = results.iter().filter(|r| !r.succeeded).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].config.name, "internal");
        assert!(platform.security_group_space("database").is_some());
    }
}
