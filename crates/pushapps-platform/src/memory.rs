//! In-memory platform
//!
//! Suitable for development and testing. Keeps applications, services,
//! security groups and logs in concurrent maps, records every call in a
//! journal, and can be scripted to fail specific calls.

use crate::client::{PlatformClient, PushRequest, RouteSpec};
use crate::error::{PlatformError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use pushapps_types::{LogLine, SecurityGroup, ServiceConfig, UserProvidedServiceConfig};
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::Mutex;

/// State of one deployed application
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationState {
    pub started: bool,
    pub stack: Option<String>,
    pub environment: BTreeMap<String, String>,
    pub services: Vec<String>,
    pub routes: Vec<RouteSpec>,
}

/// How a scripted call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Platform answers 503
    Unavailable,
    /// Platform rejects the request with a 422
    Rejected,
    /// Instance is left behind, then the request fails with a 400
    ProvisionFailed,
}

/// One recorded platform call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCall {
    pub operation: &'static str,
    pub target: String,
}

impl fmt::Display for PlatformCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.target)
    }
}

#[derive(Debug, Clone, Copy)]
struct Script {
    remaining: Option<usize>,
    failure: InjectedFailure,
}

/// In-memory platform targeting a single organization and space
pub struct InMemoryPlatform {
    organizations: DashMap<String, BTreeMap<String, String>>,
    stacks: Vec<String>,
    default_stack: String,
    applications: DashMap<String, ApplicationState>,
    services: DashMap<String, Option<UserProvidedServiceConfig>>,
    security_groups: DashMap<String, (SecurityGroup, String)>,
    logs: DashMap<String, Vec<LogLine>>,
    scripts: DashMap<String, Script>,
    journal: Mutex<Vec<PlatformCall>>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self {
            organizations: DashMap::new(),
            stacks: vec!["cflinuxfs4".to_string()],
            default_stack: "cflinuxfs4".to_string(),
            applications: DashMap::new(),
            services: DashMap::new(),
            security_groups: DashMap::new(),
            logs: DashMap::new(),
            scripts: DashMap::new(),
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Stacks offered by the platform; the first one is the default
    pub fn with_stacks<S: Into<String>>(mut self, stacks: impl IntoIterator<Item = S>) -> Self {
        self.stacks = stacks.into_iter().map(Into::into).collect();
        if let Some(first) = self.stacks.first() {
            self.default_stack = first.clone();
        }
        self
    }

    pub fn with_space(self, organization: &str, space: &str) -> Self {
        self.organizations
            .entry(organization.to_string())
            .or_default()
            .insert(space.to_string(), uuid::Uuid::new_v4().to_string());
        self
    }

    /// An application that already runs on the platform
    pub fn with_application(self, name: &str) -> Self {
        self.applications.insert(
            name.to_string(),
            ApplicationState {
                started: true,
                stack: Some(self.default_stack.clone()),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_service(self, name: &str) -> Self {
        self.services.insert(name.to_string(), None);
        self
    }

    pub fn with_logs(self, app: &str, lines: Vec<LogLine>) -> Self {
        self.logs.insert(app.to_string(), lines);
        self
    }

    /// Fail the next `times` calls of `operation` on `target`
    pub fn fail(&self, operation: &str, target: &str, times: usize, failure: InjectedFailure) {
        self.scripts.insert(
            script_key(operation, target),
            Script {
                remaining: Some(times),
                failure,
            },
        );
    }

    /// Fail every call of `operation` on `target`
    pub fn fail_always(&self, operation: &str, target: &str, failure: InjectedFailure) {
        self.scripts.insert(
            script_key(operation, target),
            Script {
                remaining: None,
                failure,
            },
        );
    }

    pub fn application(&self, name: &str) -> Option<ApplicationState> {
        self.applications.get(name).map(|a| a.clone())
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn user_provided_service(&self, name: &str) -> Option<UserProvidedServiceConfig> {
        self.services.get(name).and_then(|s| s.clone())
    }

    pub fn security_group_space(&self, name: &str) -> Option<String> {
        self.security_groups.get(name).map(|g| g.1.clone())
    }

    /// Every call made so far, in order
    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.journal.lock().await.clone()
    }

    /// Operations called on one target, in order
    pub async fn calls_for(&self, target: &str) -> Vec<&'static str> {
        self.journal
            .lock()
            .await
            .iter()
            .filter(|c| c.target == target)
            .map(|c| c.operation)
            .collect()
    }

    /// Record the call, then apply any scripted failure
    async fn record(&self, operation: &'static str, target: &str) -> Result<()> {
        self.journal.lock().await.push(PlatformCall {
            operation,
            target: target.to_string(),
        });

        let key = script_key(operation, target);
        let failure = self
            .scripts
            .get_mut(&key)
            .and_then(|mut script| match script.remaining {
                None => Some(script.failure),
                Some(0) => None,
                Some(n) => {
                    script.remaining = Some(n - 1);
                    Some(script.failure)
                }
            });

        match failure {
            None => Ok(()),
            Some(InjectedFailure::Unavailable) => Err(PlatformError::Unavailable {
                status: 503,
                message: format!("{operation} {target}: service unavailable"),
            }),
            Some(InjectedFailure::Rejected) => Err(PlatformError::Api {
                status: 422,
                message: format!("{operation} {target}: rejected"),
            }),
            Some(InjectedFailure::ProvisionFailed) => Err(PlatformError::Api {
                status: 400,
                message: format!("{operation} {target}: instance provisioning failed"),
            }),
        }
    }

    fn scripted(&self, operation: &str, target: &str) -> Option<InjectedFailure> {
        self.scripts
            .get(&script_key(operation, target))
            .filter(|script| script.remaining != Some(0))
            .map(|script| script.failure)
    }

    fn with_app<T>(&self, app: &str, f: impl FnOnce(&mut ApplicationState) -> T) -> Result<T> {
        self.applications
            .get_mut(app)
            .map(|mut state| f(&mut state))
            .ok_or_else(|| PlatformError::NotFound(format!("application {app}")))
    }
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn script_key(operation: &str, target: &str) -> String {
    format!("{operation}:{target}")
}

#[async_trait]
impl PlatformClient for InMemoryPlatform {
    async fn list_organizations(&self) -> Result<Vec<String>> {
        self.record("list_organizations", "").await?;
        Ok(self.organizations.iter().map(|o| o.key().clone()).collect())
    }

    async fn create_organization(&self, name: &str) -> Result<()> {
        self.record("create_organization", name).await?;
        if self.organizations.contains_key(name) {
            return Err(PlatformError::Conflict(format!("organization {name} exists")));
        }
        self.organizations.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn list_spaces(&self, organization: &str) -> Result<Vec<String>> {
        self.record("list_spaces", organization).await?;
        self.organizations
            .get(organization)
            .map(|spaces| spaces.keys().cloned().collect())
            .ok_or_else(|| PlatformError::NotFound(format!("organization {organization}")))
    }

    async fn create_space(&self, organization: &str, name: &str) -> Result<()> {
        self.record("create_space", name).await?;
        let mut spaces = self
            .organizations
            .get_mut(organization)
            .ok_or_else(|| PlatformError::NotFound(format!("organization {organization}")))?;
        if spaces.contains_key(name) {
            return Err(PlatformError::Conflict(format!("space {name} exists")));
        }
        spaces.insert(name.to_string(), uuid::Uuid::new_v4().to_string());
        Ok(())
    }

    async fn space_id(&self, organization: &str, space: &str) -> Result<Option<String>> {
        self.record("space_id", space).await?;
        Ok(self
            .organizations
            .get(organization)
            .and_then(|spaces| spaces.get(space).cloned()))
    }

    async fn list_stacks(&self) -> Result<Vec<String>> {
        self.record("list_stacks", "").await?;
        Ok(self.stacks.clone())
    }

    async fn list_applications(&self) -> Result<Vec<String>> {
        self.record("list_applications", "").await?;
        Ok(self.applications.iter().map(|a| a.key().clone()).collect())
    }

    async fn list_services(&self) -> Result<Vec<String>> {
        self.record("list_services", "").await?;
        Ok(self.services.iter().map(|s| s.key().clone()).collect())
    }

    async fn push_application(&self, request: &PushRequest) -> Result<()> {
        self.record("push", &request.name).await?;

        let stack = match &request.stack {
            Some(stack) if !self.stacks.contains(stack) => {
                return Err(PlatformError::Api {
                    status: 422,
                    message: format!("stack {stack} not found"),
                })
            }
            Some(stack) => stack.clone(),
            None => self.default_stack.clone(),
        };

        let mut state = self.applications.entry(request.name.clone()).or_default();
        state.started = false;
        state.stack = Some(stack);
        Ok(())
    }

    async fn set_environment_variable(&self, app: &str, name: &str, value: &str) -> Result<()> {
        self.record("set_env", app).await?;
        self.with_app(app, |state| {
            state.environment.insert(name.to_string(), value.to_string());
        })
    }

    async fn bind_service(&self, app: &str, service: &str) -> Result<()> {
        self.record("bind_service", app).await?;
        if !self.services.contains_key(service) {
            return Err(PlatformError::NotFound(format!("service {service}")));
        }
        self.with_app(app, |state| {
            if !state.services.iter().any(|s| s == service) {
                state.services.push(service.to_string());
            }
        })
    }

    async fn start_application(&self, app: &str) -> Result<()> {
        self.record("start", app).await?;
        self.with_app(app, |state| state.started = true)
    }

    async fn stop_application(&self, app: &str) -> Result<()> {
        self.record("stop", app).await?;
        self.with_app(app, |state| state.started = false)
    }

    async fn map_route(&self, app: &str, route: &RouteSpec) -> Result<()> {
        self.record("map_route", app).await?;
        self.with_app(app, |state| {
            if !state.routes.contains(route) {
                state.routes.push(route.clone());
            }
        })
    }

    async fn unmap_route(&self, app: &str, route: &RouteSpec) -> Result<()> {
        self.record("unmap_route", app).await?;
        self.with_app(app, |state| state.routes.retain(|r| r != route))
    }

    async fn recent_logs(&self, app: &str) -> Result<Vec<LogLine>> {
        self.record("recent_logs", app).await?;
        Ok(self.logs.get(app).map(|l| l.clone()).unwrap_or_default())
    }

    async fn create_service(&self, service: &ServiceConfig) -> Result<()> {
        let abandoned = self.scripted("create_service", &service.name)
            == Some(InjectedFailure::ProvisionFailed);
        let recorded = self.record("create_service", &service.name).await;
        if abandoned {
            self.services.entry(service.name.clone()).or_insert(None);
        }
        recorded?;
        if self.services.contains_key(&service.name) {
            return Err(PlatformError::Conflict(format!(
                "service {} exists",
                service.name
            )));
        }
        self.services.insert(service.name.clone(), None);
        Ok(())
    }

    async fn create_user_provided_service(
        &self,
        service: &UserProvidedServiceConfig,
    ) -> Result<()> {
        self.record("create_user_provided_service", &service.name)
            .await?;
        if self.services.contains_key(&service.name) {
            return Err(PlatformError::Conflict(format!(
                "service {} exists",
                service.name
            )));
        }
        self.services
            .insert(service.name.clone(), Some(service.clone()));
        Ok(())
    }

    async fn update_user_provided_service(
        &self,
        service: &UserProvidedServiceConfig,
    ) -> Result<()> {
        self.record("update_user_provided_service", &service.name)
            .await?;
        match self.services.get_mut(&service.name) {
            Some(mut existing) => {
                *existing = Some(service.clone());
                Ok(())
            }
            None => Err(PlatformError::NotFound(format!("service {}", service.name))),
        }
    }

    async fn create_security_group(&self, group: &SecurityGroup, space_id: &str) -> Result<()> {
        self.record("create_security_group", &group.name).await?;
        if self.security_groups.contains_key(&group.name) {
            return Err(PlatformError::Conflict(
                "The security group name is taken".to_string(),
            ));
        }
        self.security_groups
            .insert(group.name.clone(), (group.clone(), space_id.to_string()));
        Ok(())
    }
}
