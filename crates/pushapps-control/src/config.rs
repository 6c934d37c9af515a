//! Deployment configuration file

use crate::error::ConfigError;
use pushapps_deployment::SchedulerSettings;
use pushapps_platform::PlatformConfig;
use pushapps_types::{
    AppConfig, Migration, OperationConfig, SecurityGroup, ServiceConfig, UserProvidedServiceConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Everything one run deploys, plus where and how
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Run settings
    #[serde(default)]
    pub push_apps: PushAppsSettings,

    /// Target platform
    #[serde(alias = "cf")]
    pub platform: PlatformConfig,

    pub apps: Vec<AppConfig>,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    #[serde(default)]
    pub user_provided_services: Vec<UserProvidedServiceConfig>,

    #[serde(default)]
    pub migrations: Vec<Migration>,

    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
}

/// Concurrency, retry and timeout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushAppsSettings {
    #[serde(default = "default_retry_count")]
    pub operation_retry_count: u32,

    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Recent log lines printed for a failed required operation
    #[serde(default = "default_log_lines")]
    pub failed_deployment_log_lines_to_show: usize,

    #[serde(default = "default_migration_timeout")]
    pub migration_timeout_in_minutes: u64,

    /// Per-request timeout of platform calls
    #[serde(default = "default_operation_timeout")]
    pub cf_operation_timeout_in_minutes: u64,
}

impl Default for PushAppsSettings {
    fn default() -> Self {
        Self {
            operation_retry_count: default_retry_count(),
            max_in_flight: default_max_in_flight(),
            failed_deployment_log_lines_to_show: default_log_lines(),
            migration_timeout_in_minutes: default_migration_timeout(),
            cf_operation_timeout_in_minutes: default_operation_timeout(),
        }
    }
}

impl PushAppsSettings {
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            max_in_flight: self.max_in_flight,
            retries: self.operation_retry_count,
        }
    }
}

fn default_retry_count() -> u32 {
    3
}

fn default_max_in_flight() -> usize {
    2
}

fn default_log_lines() -> usize {
    50
}

fn default_migration_timeout() -> u64 {
    15
}

fn default_operation_timeout() -> u64 {
    5
}

impl Config {
    /// Read and validate a YAML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.push_apps.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "maxInFlight must be greater than zero".to_string(),
            ));
        }

        self.platform
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        ensure_unique("apps", &self.apps)?;
        ensure_unique("services", &self.services)?;
        ensure_unique("userProvidedServices", &self.user_provided_services)?;
        ensure_unique("migrations", &self.migrations)?;
        ensure_unique("securityGroups", &self.security_groups)?;
        Ok(())
    }
}

fn ensure_unique<C: OperationConfig>(section: &str, configs: &[C]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    match configs.iter().find(|c| !seen.insert(c.identifier())) {
        Some(duplicate) => Err(ConfigError::Duplicate {
            section: section.to_string(),
            identifier: duplicate.identifier().to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
cf:
  apiHost: api.example.com
  username: admin
  password: secret
  organization: dev
  space: apps
apps:
  - name: foo
    path: build/foo.zip
"#;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.push_apps, PushAppsSettings::default());
        assert_eq!(config.push_apps.operation_retry_count, 3);
        assert_eq!(config.push_apps.max_in_flight, 2);
        assert_eq!(config.push_apps.failed_deployment_log_lines_to_show, 50);
        assert_eq!(config.push_apps.migration_timeout_in_minutes, 15);
        assert_eq!(config.push_apps.cf_operation_timeout_in_minutes, 5);
        assert_eq!(config.platform.space, "apps");
        assert!(config.services.is_empty());
        assert!(config.security_groups.is_empty());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
pushApps:
  operationRetryCount: 1
  maxInFlight: 4
  failedDeploymentLogLinesToShow: 10
platform:
  apiHost: https://api.example.com
  username: admin
  password: secret
  organization: dev
  space: apps
  skipSslValidation: true
  dialTimeoutInMillis: 2000
apps:
  - name: foo
    path: build/foo.zip
    blueGreenDeploy: true
    route:
      hostname: foo
    serviceNames: [db, config]
services:
  - name: db
    plan: small
    broker: p-mysql
userProvidedServices:
  - name: config
    credentials:
      uri: https://config.example.com
migrations:
  - user: root
    password: secret
    driver: mysql
    host: 127.0.0.1
    port: 3306
    schema: users
    migrationDir: db/users
securityGroups:
  - name: internal
    destination: 10.0.0.0/16
    protocol: tcp
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.push_apps.max_in_flight, 4);
        assert_eq!(config.push_apps.migration_timeout_in_minutes, 15);
        assert_eq!(
            config.push_apps.scheduler_settings(),
            SchedulerSettings {
                max_in_flight: 4,
                retries: 1
            }
        );
        assert!(config.platform.skip_ssl_validation);
        assert!(config.apps[0].blue_green_deploy);
        assert_eq!(config.migrations[0].port, "3306");
        assert_eq!(config.user_provided_services[0].name, "config");
        assert_eq!(config.security_groups[0].protocol, "tcp");
    }

    #[test]
    fn test_zero_max_in_flight_rejected() {
        let yaml = format!("pushApps:\n  maxInFlight: 0\n{MINIMAL}");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("maxInFlight"));
    }

    #[test]
    fn test_duplicate_apps_rejected() {
        let yaml = format!("{MINIMAL}  - name: foo\n    path: build/other.zip\n");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Duplicate { ref section, ref identifier } if section == "apps" && identifier == "foo"
        ));
    }

    #[test]
    fn test_blank_platform_field_rejected() {
        let yaml = MINIMAL.replace("username: admin", "username: \"\"");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.apps[0].name, "foo");

        let err = Config::load(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
