//! Polled resource status

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::handle::RestoreHandle;

/// Attribute key for a network endpoint
pub const ENDPOINT_ATTR: &str = "endpoint";

/// Attribute key for a size in GiB
pub const SIZE_ATTR: &str = "size";

/// Attribute key for a resource type
pub const TYPE_ATTR: &str = "type";

/// Provisioning state of a restored resource.
///
/// `Pending` may move to any state; `Available` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    Pending,
    Available,
    Failed,
}

impl ResourceState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResourceState::Pending)
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceState::Pending => write!(f, "pending"),
            ResourceState::Available => write!(f, "available"),
            ResourceState::Failed => write!(f, "failed"),
        }
    }
}

/// Snapshot of a restored resource as last reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub handle: RestoreHandle,
    pub state: ResourceState,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ResourceStatus {
    /// Look up an attribute, treating blank values as missing
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
