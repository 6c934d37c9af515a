//! Platform connection settings

use crate::error::{PlatformError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where to deploy and how to authenticate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    pub api_host: String,
    pub username: String,
    pub password: String,
    pub organization: String,
    pub space: String,

    #[serde(default)]
    pub skip_ssl_validation: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dial_timeout_in_millis: Option<u64>,
}

impl PlatformConfig {
    pub fn dial_timeout(&self) -> Option<Duration> {
        self.dial_timeout_in_millis.map(Duration::from_millis)
    }

    /// API base URL, defaulting to https when no scheme is given
    pub fn base_url(&self) -> String {
        let host = self.api_host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("apiHost", &self.api_host),
            ("username", &self.username),
            ("password", &self.password),
            ("organization", &self.organization),
            ("space", &self.space),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(PlatformError::InvalidConfig(format!(
                "{field} must not be empty"
            ))),
            None => Ok(()),
        }
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
            organization: "org".to_string(),
            space: "dev".to_string(),
            skip_ssl_validation: false,
            dial_timeout_in_millis: Some(1500),
        }
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(config("api.example.com").base_url(), "https://api.example.com");
        assert_eq!(config("http://localhost:9000/").base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(config("api.example.com").validate().is_ok());

        let mut blank = config("api.example.com");
        blank.space = " ".to_string();
        let err = blank.validate().unwrap_err();
        assert!(err.to_string().contains("space"));
    }
}
