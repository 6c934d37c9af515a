//! Deployment stages
//!
//! A stage is one remote step for one application. Stages are scheduled
//! individually, so each carries the application it acts on (`target`) and
//! the application the result is reported against (`owner`). They differ
//! only during blue-green cutover, where the shadow is the target.

use crate::context::DeploymentContext;
use crate::error::Result;
use crate::logging::logged;
use futures::future::try_join_all;
use pushapps_platform::{PushRequest, RouteSpec};
use pushapps_types::{AppConfig, OperationConfig};
use tracing::debug;

/// Kind of remote step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Push,
    SetEnvironment,
    BindServices,
    Start,
    MapRoute,
    UnmapRoute,
    Stop,
}

/// One step of an application deployment
#[derive(Debug, Clone)]
pub struct Stage {
    pub kind: StageKind,
    /// Application the step acts on
    pub target: AppConfig,
    /// Application the result is reported against
    pub owner: AppConfig,
    /// Route for map and unmap steps
    pub route: Option<RouteSpec>,
}

impl Stage {
    /// A step acting on the application it reports against
    pub fn new(kind: StageKind, app: &AppConfig) -> Self {
        let route = match kind {
            StageKind::MapRoute | StageKind::UnmapRoute => RouteSpec::for_app(app),
            _ => None,
        };

        Self {
            kind,
            target: app.clone(),
            owner: app.clone(),
            route,
        }
    }

    /// Run the step against `target` while reporting against `owner`
    pub fn on_behalf_of(mut self, owner: &AppConfig) -> Self {
        self.owner = owner.clone();
        self
    }

    pub fn with_route(mut self, route: Option<RouteSpec>) -> Self {
        self.route = route;
        self
    }

    fn is_shadow(&self) -> bool {
        self.target.name != self.owner.name
    }

    pub fn description(&self) -> String {
        let target = &self.target.name;
        let owner = &self.owner.name;

        match self.kind {
            StageKind::Push => format!("Push {target}"),
            StageKind::SetEnvironment => format!("Set environment variables for {target}"),
            StageKind::BindServices => format!("Bind services for {target}"),
            StageKind::Start => format!("Start application {target}"),
            StageKind::MapRoute => format!("Map routes for {target}"),
            StageKind::UnmapRoute if self.is_shadow() => format!("Un-map blue routes {owner}"),
            StageKind::UnmapRoute => format!("Un-map current application routes {target}"),
            StageKind::Stop if self.is_shadow() => format!("Stop blue application {owner}"),
            StageKind::Stop => format!("Stop application {target}"),
        }
    }

    /// Perform the remote step
    pub async fn perform(&self, ctx: &DeploymentContext) -> Result<()> {
        let description = self.description();
        logged(&description, self.execute(ctx)).await
    }

    async fn execute(&self, ctx: &DeploymentContext) -> Result<()> {
        let platform = ctx.platform();
        let app = &self.target.name;

        match self.kind {
            StageKind::Push => {
                let stack = ctx.select_stack(&self.target.stack_priority);
                platform
                    .push_application(&PushRequest::for_app(&self.target, stack))
                    .await?;
            }
            StageKind::SetEnvironment => {
                for (name, value) in self.target.environment.iter().flatten() {
                    if value.is_empty() {
                        debug!(app = %app, variable = %name, "Setting empty environment variable");
                    }
                    platform.set_environment_variable(app, name, value).await?;
                }
            }
            StageKind::BindServices => {
                let bindable: Vec<&String> = self
                    .target
                    .service_names
                    .iter()
                    .filter(|service| {
                        let available = ctx.is_service_available(service);
                        if !available {
                            debug!(app = %app, service = %service, "Service unavailable, not binding");
                        }
                        available
                    })
                    .collect();

                try_join_all(
                    bindable
                        .into_iter()
                        .map(|service| platform.bind_service(app, service)),
                )
                .await?;
            }
            StageKind::Start => platform.start_application(app).await?,
            StageKind::MapRoute => match &self.route {
                Some(route) => platform.map_route(app, route).await?,
                None => debug!(app = %app, "No route declared"),
            },
            StageKind::UnmapRoute => {
                if let Some(route) = &self.route {
                    platform.unmap_route(app, route).await?;
                }
            }
            StageKind::Stop => platform.stop_application(app).await?,
        }

        Ok(())
    }
}

impl OperationConfig for Stage {
    fn identifier(&self) -> &str {
        &self.target.name
    }

    fn optional(&self) -> bool {
        self.owner.optional
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SchedulerSettings;
    use pushapps_platform::{InMemoryPlatform, PlatformClient};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn context(platform: Arc<InMemoryPlatform>, services: &[&str]) -> DeploymentContext {
        DeploymentContext::new(
            platform,
            services.iter().map(|s| s.to_string()).collect(),
            vec!["cflinuxfs4".to_string()],
            HashSet::new(),
            SchedulerSettings::default(),
        )
    }

    #[test]
    fn test_descriptions() {
        let foo = AppConfig::new("foo", "foo.zip");
        let shadow = AppConfig::new("foo-blue", "foo.zip");

        assert_eq!(Stage::new(StageKind::Push, &shadow).description(), "Push foo-blue");
        assert_eq!(
            Stage::new(StageKind::UnmapRoute, &foo).description(),
            "Un-map current application routes foo"
        );
        assert_eq!(
            Stage::new(StageKind::Stop, &shadow)
                .on_behalf_of(&foo)
                .description(),
            "Stop blue application foo"
        );
    }

    #[test]
    fn test_stage_reports_against_owner() {
        let foo = AppConfig::new("foo", "foo.zip").as_optional();
        let shadow = AppConfig::new("foo-blue", "foo.zip");
        let stage = Stage::new(StageKind::Stop, &shadow).on_behalf_of(&foo);

        assert_eq!(stage.identifier(), "foo-blue");
        assert!(stage.optional());
    }

    #[tokio::test]
    async fn test_bind_skips_unavailable_services() {
        let platform = Arc::new(
            InMemoryPlatform::new()
                .with_application("bar")
                .with_service("db")
                .with_service("cache"),
        );
        let ctx = context(Arc::clone(&platform), &["db"]);
        let app = AppConfig::new("bar", "bar.zip").with_services(["db", "cache", "queue"]);

        Stage::new(StageKind::BindServices, &app)
            .perform(&ctx)
            .await
            .unwrap();

        assert_eq!(platform.application("bar").unwrap().services, vec!["db"]);
    }

    #[tokio::test]
    async fn test_set_environment_accepts_empty_values() {
        let platform = Arc::new(InMemoryPlatform::new().with_application("foo"));
        let ctx = context(Arc::clone(&platform), &[]);
        let app = AppConfig::new("foo", "foo.zip").with_environment([("A", "1"), ("EMPTY", "")]);

        Stage::new(StageKind::SetEnvironment, &app)
            .perform(&ctx)
            .await
            .unwrap();

        let env = platform.application("foo").unwrap().environment;
        assert_eq!(env.get("EMPTY").map(String::as_str), Some(""));
        assert_eq!(platform.calls_for("foo").await, vec!["set_env", "set_env"]);
    }

    #[tokio::test]
    async fn test_map_route_without_route_is_noop() {
        let platform = Arc::new(InMemoryPlatform::new());
        let ctx = context(Arc::clone(&platform), &[]);

        Stage::new(StageKind::MapRoute, &AppConfig::new("ghost", "ghost.zip"))
            .perform(&ctx)
            .await
            .unwrap();

        assert!(platform.calls().await.is_empty());
        assert!(platform.list_applications().await.unwrap().is_empty());
    }
}
