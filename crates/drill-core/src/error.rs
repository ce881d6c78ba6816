//! Error types for the restore-verification pipeline

use drill_types::{ResourceId, ResourceKind, TypeError};
use thiserror::Error;

/// Errors raised by pipeline components.
///
/// Every variant except [`DrillError::Config`] is caught at the kind
/// boundary and recorded as a failed stage; none of them aborts a run.
#[derive(Debug, Error)]
pub enum DrillError {
    /// No restorable recovery point matched the selector
    #[error("No recovery point found for {kind}: {detail}")]
    NotFound { kind: ResourceKind, detail: String },

    /// The provisioning service rejected the restore call
    #[error("Restore of {kind} rejected: {reason}")]
    Provisioning { kind: ResourceKind, reason: String },

    /// The resource was still pending when the poll budget ran out
    #[error("Resource {resource_id} not ready after {attempts} polls")]
    Timeout { resource_id: ResourceId, attempts: u32 },

    /// The provider reported the restore as failed
    #[error("Provider reported {resource_id} failed: {reason}")]
    ProvisioningFailed { resource_id: ResourceId, reason: String },

    /// The backup catalog query failed
    #[error("Backup catalog error: {0}")]
    Catalog(String),

    /// A status query against the provider failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// The run was cancelled before the stage could finish
    #[error("Run cancelled")]
    Cancelled,

    /// A stage panicked
    #[error("Stage panicked: {0}")]
    Panicked(String),

    /// The run cannot attempt a kind at all
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DrillError {
    /// Create a provisioning error
    pub fn provisioning(kind: ResourceKind, reason: impl Into<String>) -> Self {
        Self::Provisioning {
            kind,
            reason: reason.into(),
        }
    }

    /// Human-readable detail recorded on the failed stage
    pub fn stage_detail(&self) -> String {
        match self {
            DrillError::NotFound { detail, .. } => format!("no recovery point: {}", detail),
            DrillError::Provisioning { reason, .. } => format!("restore rejected: {}", reason),
            other => other.to_string(),
        }
    }
}

impl From<TypeError> for DrillError {
    fn from(err: TypeError) -> Self {
        DrillError::Config(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, DrillError>;
