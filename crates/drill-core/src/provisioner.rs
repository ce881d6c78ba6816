//! Provisioning service interface
//!
//! One provisioner serves one resource kind. `create` makes a real,
//! billable resource; `get_status` must be safe to call any number of times.

use std::collections::BTreeMap;

use async_trait::async_trait;
use drill_types::{ResourceId, ResourceState, TargetSpec};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A restore request as sent to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Provider-resolvable identifier of the backup
    pub source_ref: String,

    /// Requested name for the new resource
    pub name: String,

    /// Kind-specific parameters
    pub target: TargetSpec,

    /// Tags applied to the new resource
    pub tags: BTreeMap<String, String>,
}

/// Status as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub state: ResourceState,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ProviderStatus {
    pub fn pending() -> Self {
        Self {
            state: ResourceState::Pending,
            attributes: BTreeMap::new(),
        }
    }

    pub fn available<K, V>(attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            state: ResourceState::Available,
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(FAILURE_REASON_ATTR.to_string(), reason.into());
        Self {
            state: ResourceState::Failed,
            attributes,
        }
    }
}

/// Attribute a provider uses to explain a failed state
pub const FAILURE_REASON_ATTR: &str = "reason";

/// Provisioning service for one resource kind
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Start restoring a new resource; returns its identifier
    async fn create(&self, request: &ProvisionRequest) -> Result<ResourceId>;

    /// Query the current state of a resource
    async fn get_status(&self, id: &ResourceId) -> Result<ProviderStatus>;
}
