//! Resource kinds
//!
//! A resource kind selects the provisioning, polling and validation
//! semantics applied to a recovery point.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Category of backed-up infrastructure resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Relational database instance restored from a snapshot
    Database,
    /// Block-storage volume created from a snapshot
    Volume,
}

impl ResourceKind {
    /// All known kinds, in report order
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Database, ResourceKind::Volume];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Database => "database",
            ResourceKind::Volume => "volume",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "database" | "db" | "rds" => Ok(ResourceKind::Database),
            "volume" | "vol" | "ebs" => Ok(ResourceKind::Volume),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}
