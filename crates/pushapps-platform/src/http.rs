//! HTTP platform client

use crate::client::{PlatformClient, PushRequest, RouteSpec};
use crate::config::PlatformConfig;
use crate::error::{PlatformError, Result};
use async_trait::async_trait;
use pushapps_types::{LogLine, SecurityGroup, ServiceConfig, UserProvidedServiceConfig};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Named platform resource as listed by the API
#[derive(Debug, Clone, Deserialize)]
struct Resource {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct NameRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct EnvironmentValue<'a> {
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SecurityGroupRule<'a> {
    destination: &'a str,
    protocol: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateSecurityGroupRequest<'a> {
    name: &'a str,
    rules: Vec<SecurityGroupRule<'a>>,
    spaces: Vec<&'a str>,
}

/// JSON-over-HTTP client for the platform API
pub struct HttpPlatformClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    organization: String,
    space: String,
}

impl HttpPlatformClient {
    /// Build a client targeting the configured organization and space.
    /// `operation_timeout` bounds every request.
    pub fn new(config: &PlatformConfig, operation_timeout: Duration) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .timeout(operation_timeout)
            .danger_accept_invalid_certs(config.skip_ssl_validation);
        if let Some(dial) = config.dial_timeout() {
            builder = builder.connect_timeout(dial);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            organization: config.organization.clone(),
            space: config.space.clone(),
        })
    }

    fn space_path(&self) -> String {
        format!(
            "/v1/organizations/{}/spaces/{}",
            self.organization, self.space
        )
    }

    fn app_path(&self, app: &str) -> String {
        format!("{}/apps/{}", self.space_path(), app)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Platform request");
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send(self.request(reqwest::Method::POST, path).json(body))
            .await
    }

    async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send(self.request(reqwest::Method::PUT, path).json(body))
            .await
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => PlatformError::NotFound(message),
            StatusCode::CONFLICT => PlatformError::Conflict(message),
            s if s.is_server_error() => PlatformError::Unavailable {
                status: s.as_u16(),
                message,
            },
            s => PlatformError::Api {
                status: s.as_u16(),
                message,
            },
        })
    }

    async fn names(&self, path: &str) -> Result<Vec<String>> {
        let resources: Vec<Resource> = self.get(path).await?;
        Ok(resources.into_iter().map(|r| r.name).collect())
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn list_organizations(&self) -> Result<Vec<String>> {
        self.names("/v1/organizations").await
    }

    async fn create_organization(&self, name: &str) -> Result<()> {
        self.post("/v1/organizations", &NameRequest { name }).await
    }

    async fn list_spaces(&self, organization: &str) -> Result<Vec<String>> {
        self.names(&format!("/v1/organizations/{organization}/spaces"))
            .await
    }

    async fn create_space(&self, organization: &str, name: &str) -> Result<()> {
        self.post(
            &format!("/v1/organizations/{organization}/spaces"),
            &NameRequest { name },
        )
        .await
    }

    async fn space_id(&self, organization: &str, space: &str) -> Result<Option<String>> {
        let spaces: Vec<Resource> = self
            .get(&format!("/v1/organizations/{organization}/spaces"))
            .await?;
        Ok(spaces.into_iter().find(|s| s.name == space).map(|s| s.id))
    }

    async fn list_stacks(&self) -> Result<Vec<String>> {
        self.names("/v1/stacks").await
    }

    async fn list_applications(&self) -> Result<Vec<String>> {
        self.names(&format!("{}/apps", self.space_path())).await
    }

    async fn list_services(&self) -> Result<Vec<String>> {
        self.names(&format!("{}/service_instances", self.space_path()))
            .await
    }

    async fn push_application(&self, request: &PushRequest) -> Result<()> {
        let bits = tokio::fs::read(&request.path)
            .await
            .map_err(|source| PlatformError::Artifact {
                path: request.path.clone(),
                source,
            })?;

        let app_path = self.app_path(&request.name);
        self.put(&app_path, request).await?;
        self.send(
            self.request(reqwest::Method::PUT, &format!("{app_path}/bits"))
                .header(reqwest::header::CONTENT_TYPE, "application/zip")
                .body(bits),
        )
        .await
    }

    async fn set_environment_variable(&self, app: &str, name: &str, value: &str) -> Result<()> {
        self.put(
            &format!("{}/env/{}", self.app_path(app), name),
            &EnvironmentValue { value },
        )
        .await
    }

    async fn bind_service(&self, app: &str, service: &str) -> Result<()> {
        self.send(self.request(
            reqwest::Method::PUT,
            &format!("{}/service_bindings/{}", self.app_path(app), service),
        ))
        .await
    }

    async fn start_application(&self, app: &str) -> Result<()> {
        self.send(self.request(
            reqwest::Method::POST,
            &format!("{}/start", self.app_path(app)),
        ))
        .await
    }

    async fn stop_application(&self, app: &str) -> Result<()> {
        self.send(self.request(
            reqwest::Method::POST,
            &format!("{}/stop", self.app_path(app)),
        ))
        .await
    }

    async fn map_route(&self, app: &str, route: &RouteSpec) -> Result<()> {
        self.put(&format!("{}/routes", self.app_path(app)), route)
            .await
    }

    async fn unmap_route(&self, app: &str, route: &RouteSpec) -> Result<()> {
        let request = self
            .request(
                reqwest::Method::DELETE,
                &format!("{}/routes", self.app_path(app)),
            )
            .json(route);
        match self.send(request).await {
            Err(PlatformError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn recent_logs(&self, app: &str) -> Result<Vec<LogLine>> {
        self.get(&format!("{}/recent_logs", self.app_path(app)))
            .await
    }

    async fn create_service(&self, service: &ServiceConfig) -> Result<()> {
        self.post(&format!("{}/service_instances", self.space_path()), service)
            .await
    }

    async fn create_user_provided_service(
        &self,
        service: &UserProvidedServiceConfig,
    ) -> Result<()> {
        self.post(
            &format!("{}/user_provided_service_instances", self.space_path()),
            service,
        )
        .await
    }

    async fn update_user_provided_service(
        &self,
        service: &UserProvidedServiceConfig,
    ) -> Result<()> {
        self.put(
            &format!(
                "{}/user_provided_service_instances/{}",
                self.space_path(),
                service.name
            ),
            service,
        )
        .await
    }

    async fn create_security_group(&self, group: &SecurityGroup, space_id: &str) -> Result<()> {
        let request = CreateSecurityGroupRequest {
            name: &group.name,
            rules: vec![SecurityGroupRule {
                destination: &group.destination,
                protocol: &group.protocol,
            }],
            spaces: vec![space_id],
        };
        self.post("/v1/security_groups", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_host: &str) -> PlatformConfig {
        PlatformConfig {
            api_host: api_host.to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            organization: "acme".to_string(),
            space: "dev".to_string(),
            skip_ssl_validation: true,
            dial_timeout_in_millis: Some(500),
        }
    }

    #[test]
    fn test_client_creation() {
        let client =
            HttpPlatformClient::new(&config("api.example.com/"), Duration::from_secs(300)).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
        assert_eq!(
            client.app_path("foo"),
            "/v1/organizations/acme/spaces/dev/apps/foo"
        );
    }

    #[test]
    fn test_client_rejects_incomplete_config() {
        let mut incomplete = config("api.example.com");
        incomplete.username.clear();
        assert!(matches!(
            HttpPlatformClient::new(&incomplete, Duration::from_secs(300)),
            Err(PlatformError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_push_fails_on_missing_artifact() {
        let client =
            HttpPlatformClient::new(&config("localhost:1"), Duration::from_secs(1)).unwrap();
        let app = pushapps_types::AppConfig::new("foo", "/nonexistent/foo.zip");

        let err = client
            .push_application(&PushRequest::for_app(&app, None))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Artifact { .. }));
    }
}
