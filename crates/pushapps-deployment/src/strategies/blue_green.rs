//! Blue-Green deployment strategy

use super::executor::DeploymentExecutor;
use crate::context::DeploymentContext;
use crate::error::Result;
use crate::pipeline::{pipeline_stages, run_stages};
use crate::stage::{Stage, StageKind};
use crate::PhaseResult;
use async_trait::async_trait;
use pushapps_platform::RouteSpec;
use pushapps_types::AppConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Suffix of the shadow application
pub const SHADOW_SUFFIX: &str = "-blue";

/// Steps of a blue-green cutover, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoverState {
    /// Full pipeline on the routeless shadow
    DeployShadow,
    /// Unmap the production route from the running application, if any
    ConditionalUnmapCurrent,
    /// Full pipeline on the production application, route included
    DeployProduction,
    /// Clear the production route from the shadow
    UnmapShadow,
    /// Stop the shadow, keeping it around for inspection
    StopShadow,
    Done,
}

impl CutoverState {
    pub fn next(self) -> Self {
        match self {
            CutoverState::DeployShadow => CutoverState::ConditionalUnmapCurrent,
            CutoverState::ConditionalUnmapCurrent => CutoverState::DeployProduction,
            CutoverState::DeployProduction => CutoverState::UnmapShadow,
            CutoverState::UnmapShadow => CutoverState::StopShadow,
            CutoverState::StopShadow | CutoverState::Done => CutoverState::Done,
        }
    }
}

/// Blue-Green deployment executor
///
/// Deploys a routeless `<name>-blue` shadow, moves the route onto a freshly
/// deployed production application, then stops the shadow.
#[derive(Debug, Default)]
pub struct BlueGreenDeploymentExecutor;

impl BlueGreenDeploymentExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Shadow copy of `app` with its route suppressed
    pub fn shadow_of(app: &AppConfig) -> AppConfig {
        AppConfig {
            name: format!("{}{}", app.name, SHADOW_SUFFIX),
            route: None,
            no_route: Some(true),
            ..app.clone()
        }
    }

    fn stages(
        state: CutoverState,
        production: &AppConfig,
        shadow: &AppConfig,
        ctx: &DeploymentContext,
    ) -> Vec<Stage> {
        match state {
            CutoverState::DeployShadow => pipeline_stages(shadow)
                .into_iter()
                .map(|stage| stage.on_behalf_of(production))
                .collect(),
            CutoverState::ConditionalUnmapCurrent if ctx.application_exists(&production.name) => {
                vec![Stage::new(StageKind::UnmapRoute, production)]
            }
            CutoverState::ConditionalUnmapCurrent => Vec::new(),
            CutoverState::DeployProduction => pipeline_stages(production),
            CutoverState::UnmapShadow => vec![Stage::new(StageKind::UnmapRoute, shadow)
                .on_behalf_of(production)
                .with_route(RouteSpec::for_app(production))],
            CutoverState::StopShadow => {
                vec![Stage::new(StageKind::Stop, shadow).on_behalf_of(production)]
            }
            CutoverState::Done => Vec::new(),
        }
    }
}

#[async_trait]
impl DeploymentExecutor for BlueGreenDeploymentExecutor {
    async fn execute(
        &self,
        app: &AppConfig,
        ctx: &Arc<DeploymentContext>,
    ) -> Result<Vec<PhaseResult<AppConfig>>> {
        let shadow = Self::shadow_of(app);
        info!(
            app = %app.name,
            shadow = %shadow.name,
            replacing = ctx.application_exists(&app.name),
            "Starting blue-green deployment"
        );

        let mut results = Vec::new();
        let mut state = CutoverState::DeployShadow;

        while state != CutoverState::Done {
            let outcome = run_stages(Self::stages(state, app, &shadow, ctx), ctx).await?;
            results.extend(outcome.results);

            if !outcome.completed {
                warn!(app = %app.name, state = ?state, "Blue-green deployment halted");
                return Ok(results);
            }
            state = state.next();
        }

        info!(app = %app.name, "Blue-green deployment completed");
        Ok(results)
    }

    fn name(&self) -> &str {
        "blue-green"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SchedulerSettings;
    use pushapps_platform::{InMemoryPlatform, InjectedFailure, PlatformClient};
    use std::collections::HashSet;

    async fn context(platform: &Arc<InMemoryPlatform>) -> Arc<DeploymentContext> {
        let existing = platform.list_applications().await.unwrap();
        Arc::new(DeploymentContext::new(
            Arc::clone(platform) as Arc<dyn PlatformClient>,
            HashSet::new(),
            vec!["cflinuxfs4".to_string()],
            existing.into_iter().collect(),
            SchedulerSettings {
                max_in_flight: 2,
                retries: 0,
            },
        ))
    }

    fn foo() -> AppConfig {
        AppConfig::new("foo", "foo.zip")
            .with_route("foo", None)
            .with_domain("apps.example.com")
            .with_blue_green()
    }

    #[test]
    fn test_cutover_order() {
        let mut state = CutoverState::DeployShadow;
        let mut visited = vec![state];
        while state != CutoverState::Done {
            state = state.next();
            visited.push(state);
        }
        assert_eq!(visited.len(), 6);
        assert_eq!(visited[2], CutoverState::DeployProduction);
    }

    #[test]
    fn test_shadow_has_no_route() {
        let shadow = BlueGreenDeploymentExecutor::shadow_of(&foo());
        assert_eq!(shadow.name, "foo-blue");
        assert!(shadow.route.is_none());
        assert!(!shadow.has_route());
        assert_eq!(shadow.path, "foo.zip");
    }

    #[tokio::test]
    async fn test_replaces_existing_application() {
        let platform = Arc::new(InMemoryPlatform::new().with_application("foo"));
        let ctx = context(&platform).await;

        let results = BlueGreenDeploymentExecutor::new()
            .execute(&foo(), &ctx)
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.succeeded && r.config.name == "foo"));
        let descriptions: Vec<&str> = results.iter().map(|r| r.description.as_str()).collect();
        for expected in [
            "Push foo-blue",
            "Start application foo-blue",
            "Un-map current application routes foo",
            "Push foo",
            "Map routes for foo",
            "Un-map blue routes foo",
            "Stop blue application foo",
        ] {
            assert!(descriptions.contains(&expected), "missing {expected}");
        }

        assert_eq!(
            platform.calls_for("foo-blue").await,
            vec!["push", "start", "unmap_route", "stop"]
        );
        assert_eq!(
            platform.calls_for("foo").await,
            vec!["unmap_route", "push", "start", "map_route"]
        );

        let calls = platform.calls().await;
        let position = |op: &str, target: &str| {
            calls
                .iter()
                .position(|c| c.operation == op && c.target == target)
                .unwrap()
        };
        assert!(position("start", "foo-blue") < position("unmap_route", "foo"));
        assert!(position("map_route", "foo") < position("stop", "foo-blue"));

        let shadow = platform.application("foo-blue").unwrap();
        assert!(!shadow.started);
        assert!(shadow.routes.is_empty());
        let production = platform.application("foo").unwrap();
        assert!(production.started);
        assert_eq!(production.routes.len(), 1);
    }

    #[tokio::test]
    async fn test_first_deploy_skips_unmapping_current() {
        let platform = Arc::new(InMemoryPlatform::new());
        let ctx = context(&platform).await;

        let results = BlueGreenDeploymentExecutor::new()
            .execute(&foo(), &ctx)
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.succeeded));
        assert!(!results
            .iter()
            .any(|r| r.description == "Un-map current application routes foo"));
        assert_eq!(results.len(), 12);
    }

    #[tokio::test]
    async fn test_shadow_failure_leaves_production_untouched() {
        let platform = Arc::new(InMemoryPlatform::new().with_application("foo"));
        platform.fail_always("start", "foo-blue", InjectedFailure::Rejected);
        let ctx = context(&platform).await;

        let results = BlueGreenDeploymentExecutor::new()
            .execute(&foo(), &ctx)
            .await
            .unwrap();

        let last = results.last().unwrap();
        assert!(!last.succeeded);
        assert_eq!(last.description, "Start application foo-blue");
        assert!(platform.calls_for("foo").await.is_empty());
    }
}
