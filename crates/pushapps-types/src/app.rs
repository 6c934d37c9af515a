//! Application deployment configuration

use crate::operation::OperationConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// An application to push onto the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Application name, unique within the application phase
    pub name: String,

    /// Path to the artifact to upload
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Environment variables; scalar values are stringified
    #[serde(default, deserialize_with = "environment_serde::deserialize")]
    pub environment: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,

    /// Disk quota in megabytes
    #[serde(default, deserialize_with = "megabytes_serde::deserialize")]
    pub disk_quota: Option<u32>,

    /// Memory in megabytes
    #[serde(default, deserialize_with = "megabytes_serde::deserialize")]
    pub memory: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_hostname: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_route: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteConfig>,

    /// Start timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    /// Replace the running application through a routeless shadow
    #[serde(default)]
    pub blue_green_deploy: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<String>,

    /// Stacks in order of preference
    #[serde(default)]
    pub stack_priority: Vec<String>,

    /// Services to bind once they are available
    #[serde(default)]
    pub service_names: Vec<String>,

    #[serde(default)]
    pub optional: bool,
}

/// Route mapped to an application after it starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub hostname: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl AppConfig {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            buildpack: None,
            command: None,
            environment: None,
            instances: None,
            disk_quota: None,
            memory: None,
            no_hostname: None,
            no_route: None,
            route: None,
            timeout: None,
            blue_green_deploy: false,
            domain: None,
            health_check_type: None,
            stack_priority: Vec::new(),
            service_names: Vec::new(),
            optional: false,
        }
    }

    pub fn with_route(mut self, hostname: impl Into<String>, path: Option<String>) -> Self {
        self.route = Some(RouteConfig {
            hostname: hostname.into(),
            path,
        });
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_environment<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.environment = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_services<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.service_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stack_priority<S: Into<String>>(
        mut self,
        stacks: impl IntoIterator<Item = S>,
    ) -> Self {
        self.stack_priority = stacks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_blue_green(mut self) -> Self {
        self.blue_green_deploy = true;
        self
    }

    pub fn as_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether the route stage has anything to map
    pub fn has_route(&self) -> bool {
        self.route.is_some() && self.no_route != Some(true)
    }
}

impl OperationConfig for AppConfig {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn optional(&self) -> bool {
        self.optional
    }
}

/// Error parsing a size such as `512M` or `1G`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid size '{0}': expected a number of megabytes, optionally suffixed with M or G")]
pub struct SizeParseError(pub String);

/// Convert `512`, `512M` or `1G` into megabytes
pub fn parse_megabytes(text: &str) -> Result<u32, SizeParseError> {
    let trimmed = text.trim();
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('M') | Some('m') => (&trimmed[..trimmed.len() - 1], 1),
        Some('G') | Some('g') => (&trimmed[..trimmed.len() - 1], 1024),
        _ => (trimmed, 1),
    };

    digits
        .parse::<u32>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| SizeParseError(text.to_string()))
}

mod megabytes_serde {
    use super::parse_megabytes;
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u32),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Size>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Size::Number(n)) => Ok(Some(n)),
            Some(Size::Text(text)) => parse_megabytes(&text).map(Some).map_err(D::Error::custom),
        }
    }
}

mod environment_serde {
    use super::*;
    use serde_json::Value;

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<BTreeMap<String, String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
        Ok(raw.map(|vars| {
            vars.into_iter()
                .map(|(key, value)| {
                    let text = match value {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (key, text)
                })
                .collect()
        }))
    }
}
