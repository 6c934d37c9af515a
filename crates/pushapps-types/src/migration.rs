//! Database schema migration configuration

use crate::operation::OperationConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Database engine a migration targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatabaseDriver {
    MySql,
    Postgres,
}

impl From<String> for DatabaseDriver {
    /// Anything other than `mysql` is treated as Postgres
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("mysql") {
            DatabaseDriver::MySql
        } else {
            DatabaseDriver::Postgres
        }
    }
}

impl From<DatabaseDriver> for String {
    fn from(driver: DatabaseDriver) -> Self {
        driver.to_string()
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseDriver::MySql => write!(f, "mysql"),
            DatabaseDriver::Postgres => write!(f, "postgres"),
        }
    }
}

/// A directory of SQL migrations applied to one schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    pub user: String,
    pub password: String,
    pub driver: DatabaseDriver,
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: String,
    /// Schema (database) name; identifies the migration
    pub schema: String,
    pub migration_dir: String,
    #[serde(default)]
    pub repair: bool,
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
    #[serde(default)]
    pub optional: bool,
}

impl OperationConfig for Migration {
    fn identifier(&self) -> &str {
        &self.schema
    }

    fn optional(&self) -> bool {
        self.optional
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
    })
}
