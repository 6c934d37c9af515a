//! Brokered and user-provided service configuration

use crate::operation::OperationConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A brokered service instance to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub plan: String,
    pub broker: String,
    #[serde(default)]
    pub optional: bool,
}

impl OperationConfig for ServiceConfig {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn optional(&self) -> bool {
        self.optional
    }
}

/// A user-provided service carrying static credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProvidedServiceConfig {
    pub name: String,
    #[serde(default)]
    pub credentials: Map<String, Value>,
    #[serde(default)]
    pub optional: bool,
}

impl OperationConfig for UserProvidedServiceConfig {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn optional(&self) -> bool {
        self.optional
    }
}
