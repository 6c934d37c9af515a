//! Security group configuration

use crate::operation::OperationConfig;
use serde::{Deserialize, Serialize};

/// An egress rule bound to the target space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub name: String,

    /// Destination address or range, e.g. `10.0.0.0-10.0.0.255`
    pub destination: String,

    /// `tcp`, `udp`, `icmp` or `all`
    pub protocol: String,

    #[serde(default)]
    pub optional: bool,
}

impl OperationConfig for SecurityGroup {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn optional(&self) -> bool {
        self.optional
    }
}
