//! Service and user-provided service phases

use crate::context::SchedulerSettings;
use crate::error::{DeploymentError, Result};
use crate::logging::logged;
use crate::PhaseResult;
use pushapps_platform::PlatformClient;
use pushapps_scheduler::{operation_fn, OperationScheduler, WorkQueue};
use pushapps_types::{OperationResult, ServiceConfig, UserProvidedServiceConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// Creates brokered service instances that do not exist yet
pub struct ServiceCreator {
    platform: Arc<dyn PlatformClient>,
    settings: SchedulerSettings,
}

impl ServiceCreator {
    pub fn new(platform: Arc<dyn PlatformClient>, settings: SchedulerSettings) -> Self {
        Self { platform, settings }
    }

    /// Create every missing service
    ///
    /// Services that already exist are reported as succeeded without a
    /// platform call, so a rerun against satisfied state is a no-op.
    #[instrument(skip_all, fields(services = services.len()))]
    pub async fn create_services(
        &self,
        services: Vec<ServiceConfig>,
    ) -> Result<Vec<PhaseResult<ServiceConfig>>> {
        let existing: HashSet<String> = self.platform.list_services().await?.into_iter().collect();
        let (present, missing): (Vec<_>, Vec<_>) = services
            .into_iter()
            .partition(|service| existing.contains(&service.name));

        let mut results: Vec<PhaseResult<ServiceConfig>> = present
            .into_iter()
            .map(|service| {
                info!(service = %service.name, "Service already exists, skipping");
                OperationResult::success(format!("Service {} already exists", service.name), service)
            })
            .collect();

        if missing.is_empty() {
            return Ok(results);
        }

        let names: Vec<&str> = missing.iter().map(|s| s.name.as_str()).collect();
        info!("Creating services: {}", names.join(", "));

        let platform = Arc::clone(&self.platform);
        let operation = operation_fn(move |service: ServiceConfig| {
            let platform = Arc::clone(&platform);
            async move {
                let description = create_description(&service);
                logged(&description, async {
                    platform
                        .create_service(&service)
                        .await
                        .map_err(DeploymentError::from)
                })
                .await
            }
        });

        let report = OperationScheduler::builder(WorkQueue::from_items(missing), operation)
            .action("Creating services")
            .max_in_flight(self.settings.max_in_flight)
            .retries(self.settings.retries)
            .description(create_description)
            .build()?
            .run()
            .await?;

        results.extend(report.results);
        Ok(results)
    }
}

fn create_description(service: &ServiceConfig) -> String {
    format!("Creating service {}", service.name)
}

/// Creates user-provided services, updating credentials of ones that exist
pub struct UserProvidedServiceCreator {
    platform: Arc<dyn PlatformClient>,
    settings: SchedulerSettings,
}

impl UserProvidedServiceCreator {
    pub fn new(platform: Arc<dyn PlatformClient>, settings: SchedulerSettings) -> Self {
        Self { platform, settings }
    }

    #[instrument(skip_all, fields(services = services.len()))]
    pub async fn create_services(
        &self,
        services: Vec<UserProvidedServiceConfig>,
    ) -> Result<Vec<PhaseResult<UserProvidedServiceConfig>>> {
        if services.is_empty() {
            return Ok(Vec::new());
        }

        let existing: Arc<HashSet<String>> =
            Arc::new(self.platform.list_services().await?.into_iter().collect());
        let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
        info!("Creating user provided services: {}", names.join(", "));

        let platform = Arc::clone(&self.platform);
        let lookup = Arc::clone(&existing);
        let operation = operation_fn(move |service: UserProvidedServiceConfig| {
            let platform = Arc::clone(&platform);
            let exists = lookup.contains(&service.name);
            async move {
                if exists {
                    let description = format!("Updating user provided service {}", service.name);
                    logged(&description, async {
                        platform
                            .update_user_provided_service(&service)
                            .await
                            .map_err(DeploymentError::from)
                    })
                    .await
                } else {
                    let description = format!("Creating user provided service {}", service.name);
                    logged(&description, async {
                        platform
                            .create_user_provided_service(&service)
                            .await
                            .map_err(DeploymentError::from)
                    })
                    .await
                }
            }
        });

        let report = OperationScheduler::builder(WorkQueue::from_items(services), operation)
            .action("Creating user provided services")
            .max_in_flight(self.settings.max_in_flight)
            .retries(self.settings.retries)
            .description(move |service: &UserProvidedServiceConfig| {
                let verb = if existing.contains(&service.name) {
                    "Updating"
                } else {
                    "Creating"
                };
                format!("{verb} user provided service {}", service.name)
            })
            .build()?
            .run()
            .await?;

        Ok(report.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushapps_platform::{InMemoryPlatform, InjectedFailure};
    use serde_json::json;

    fn settings(retries: u32) -> SchedulerSettings {
        SchedulerSettings {
            max_in_flight: 2,
            retries,
        }
    }

    fn service(name: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            plan: "small".to_string(),
            broker: "p-mysql".to_string(),
            optional: false,
        }
    }

    fn user_provided(name: &str, uri: &str) -> UserProvidedServiceConfig {
        let credentials = json!({ "uri": uri });
        UserProvidedServiceConfig {
            name: name.to_string(),
            credentials: credentials.as_object().cloned().unwrap_or_default(),
            optional: false,
        }
    }

    #[tokio::test]
    async fn test_creates_missing_services_and_skips_existing() {
        let platform = Arc::new(InMemoryPlatform::new().with_service("db"));
        let creator = ServiceCreator::new(Arc::clone(&platform) as Arc<dyn PlatformClient>, settings(0));

        let results = creator
            .create_services(vec![service("db"), service("cache")])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.succeeded));
        assert!(platform.has_service("cache"));
        assert_eq!(platform.calls_for("db").await, Vec::<&str>::new());
        assert_eq!(platform.calls_for("cache").await, vec!["create_service"]);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let platform = Arc::new(InMemoryPlatform::new());
        let creator = ServiceCreator::new(Arc::clone(&platform) as Arc<dyn PlatformClient>, settings(0));

        let first = creator.create_services(vec![service("cache")]).await.unwrap();
        let second = creator.create_services(vec![service("cache")]).await.unwrap();

        assert!(first[0].succeeded);
        assert!(second[0].succeeded);
        assert_eq!(second[0].description, "Service cache already exists");
        assert_eq!(platform.calls_for("cache").await, vec!["create_service"]);
    }

    #[tokio::test]
    async fn test_failed_creation_is_reported() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.fail_always("create_service", "cache", InjectedFailure::Rejected);
        let creator = ServiceCreator::new(Arc::clone(&platform) as Arc<dyn PlatformClient>, settings(1));

        let results = creator.create_services(vec![service("cache")]).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].succeeded);
        assert_eq!(results[0].description, "Creating service cache");
        assert_eq!(results[0].error.as_ref().and_then(|e| e.platform_status()), Some(422));
        assert_eq!(platform.calls_for("cache").await, vec!["create_service"; 2]);
    }

    #[tokio::test]
    async fn test_user_provided_services_update_or_create() {
        let platform = Arc::new(InMemoryPlatform::new());
        let creator =
            UserProvidedServiceCreator::new(Arc::clone(&platform) as Arc<dyn PlatformClient>, settings(0));

        creator
            .create_services(vec![user_provided("config", "http://one")])
            .await
            .unwrap();
        let results = creator
            .create_services(vec![
                user_provided("config", "http://two"),
                user_provided("secrets", "http://vault"),
            ])
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.succeeded));
        let descriptions: Vec<&str> = results.iter().map(|r| r.description.as_str()).collect();
        assert!(descriptions.contains(&"Updating user provided service config"));
        assert!(descriptions.contains(&"Creating user provided service secrets"));

        let config = platform.user_provided_service("config").unwrap();
        assert_eq!(config.credentials["uri"], "http://two");
        assert_eq!(
            platform.calls_for("config").await,
            vec!["create_user_provided_service", "update_user_provided_service"]
        );
    }

    #[tokio::test]
    async fn test_no_user_provided_services_skips_platform() {
        let platform = Arc::new(InMemoryPlatform::new());
        let creator =
            UserProvidedServiceCreator::new(Arc::clone(&platform) as Arc<dyn PlatformClient>, settings(0));

        let results = creator.create_services(Vec::new()).await.unwrap();

        assert!(results.is_empty());
        assert!(platform.calls().await.is_empty());
    }
}
