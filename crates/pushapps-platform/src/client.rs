//! Platform client trait and request types

use crate::error::Result;
use async_trait::async_trait;
use pushapps_types::{
    AppConfig, LogLine, SecurityGroup, ServiceConfig, UserProvidedServiceConfig,
};
use serde::{Deserialize, Serialize};

/// Everything needed to upload an application without starting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_quota: Option<u32>,
    /// `None` leaves the choice to the platform default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_hostname: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_route: Option<bool>,
}

impl PushRequest {
    pub fn for_app(app: &AppConfig, stack: Option<String>) -> Self {
        Self {
            name: app.name.clone(),
            path: app.path.clone(),
            buildpack: app.buildpack.clone(),
            command: app.command.clone(),
            instances: app.instances,
            memory: app.memory,
            disk_quota: app.disk_quota,
            stack,
            health_check_type: app.health_check_type.clone(),
            timeout: app.timeout,
            domain: app.domain.clone(),
            no_hostname: app.no_hostname,
            no_route: app.no_route,
        }
    }
}

/// A route in `hostname.domain/path` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteSpec {
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl RouteSpec {
    /// Route declared by an application, if any
    pub fn for_app(app: &AppConfig) -> Option<Self> {
        if !app.has_route() {
            return None;
        }
        app.route.as_ref().map(|route| Self {
            hostname: route.hostname.clone(),
            domain: app.domain.clone(),
            path: route.path.clone(),
        })
    }
}

impl std::fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hostname)?;
        if let Some(domain) = &self.domain {
            write!(f, ".{domain}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "/{}", path.trim_start_matches('/'))?;
        }
        Ok(())
    }
}

/// Remote platform operations, scoped to the targeted organization and space
#[async_trait]
pub trait PlatformClient: Send + Sync {
    // Organizations and spaces

    async fn list_organizations(&self) -> Result<Vec<String>>;

    async fn create_organization(&self, name: &str) -> Result<()>;

    async fn list_spaces(&self, organization: &str) -> Result<Vec<String>>;

    async fn create_space(&self, organization: &str, name: &str) -> Result<()>;

    /// Identifier of a space, `None` if it does not exist
    async fn space_id(&self, organization: &str, space: &str) -> Result<Option<String>>;

    // Inventory

    async fn list_stacks(&self) -> Result<Vec<String>>;

    async fn list_applications(&self) -> Result<Vec<String>>;

    /// Names of every service instance, brokered and user-provided
    async fn list_services(&self) -> Result<Vec<String>>;

    // Applications

    /// Upload bits and settings. Never starts the application.
    async fn push_application(&self, request: &PushRequest) -> Result<()>;

    async fn set_environment_variable(&self, app: &str, name: &str, value: &str) -> Result<()>;

    async fn bind_service(&self, app: &str, service: &str) -> Result<()>;

    async fn start_application(&self, app: &str) -> Result<()>;

    async fn stop_application(&self, app: &str) -> Result<()>;

    async fn map_route(&self, app: &str, route: &RouteSpec) -> Result<()>;

    /// Unmapping a route that is not mapped succeeds
    async fn unmap_route(&self, app: &str, route: &RouteSpec) -> Result<()>;

    async fn recent_logs(&self, app: &str) -> Result<Vec<LogLine>>;

    // Services and policies

    async fn create_service(&self, service: &ServiceConfig) -> Result<()>;

    async fn create_user_provided_service(
        &self,
        service: &UserProvidedServiceConfig,
    ) -> Result<()>;

    async fn update_user_provided_service(
        &self,
        service: &UserProvidedServiceConfig,
    ) -> Result<()>;

    async fn create_security_group(&self, group: &SecurityGroup, space_id: &str) -> Result<()>;
}
