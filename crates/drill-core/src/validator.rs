//! Post-restore validation
//!
//! Validation only inspects the attributes the waiter already fetched. It
//! makes no calls and returns the same outcome for the same status.

use drill_types::status::{ENDPOINT_ATTR, SIZE_ATTR, TYPE_ATTR};
use drill_types::{ResourceKind, ResourceState, ResourceStatus};
use serde::{Deserialize, Serialize};

/// Verdict on a restored resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ValidationOutcome {
    Ok { summary: String },
    Failed { reason: String },
}

impl ValidationOutcome {
    fn ok(summary: impl Into<String>) -> Self {
        Self::Ok {
            summary: summary.into(),
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok { .. })
    }

    /// Summary on success, reason on failure
    pub fn detail(&self) -> &str {
        match self {
            ValidationOutcome::Ok { summary } => summary,
            ValidationOutcome::Failed { reason } => reason,
        }
    }
}

/// Judge whether a ready resource looks sane for its kind
pub fn validate(status: &ResourceStatus) -> ValidationOutcome {
    if status.state != ResourceState::Available {
        return ValidationOutcome::failed(format!(
            "resource {} is {}, expected available",
            status.handle.id, status.state
        ));
    }

    match status.handle.kind {
        ResourceKind::Database => validate_database(status),
        ResourceKind::Volume => validate_volume(status),
    }
}

fn validate_database(status: &ResourceStatus) -> ValidationOutcome {
    match status.attribute(ENDPOINT_ATTR) {
        Some(endpoint) => ValidationOutcome::ok(format!("endpoint {}", endpoint)),
        None => ValidationOutcome::failed("database endpoint missing"),
    }
}

fn validate_volume(status: &ResourceStatus) -> ValidationOutcome {
    let Some(size) = status.attribute(SIZE_ATTR) else {
        return ValidationOutcome::failed("volume size missing");
    };
    let size_gib = match size.parse::<u64>() {
        Ok(gib) => gib,
        Err(_) => return ValidationOutcome::failed(format!("volume size {:?} is not numeric", size)),
    };
    if let Some(expected) = status.handle.source.size_hint {
        if size_gib != expected {
            return ValidationOutcome::failed(format!(
                "volume size {} GiB differs from snapshot size {} GiB",
                size_gib, expected
            ));
        }
    }

    let Some(volume_type) = status.attribute(TYPE_ATTR) else {
        return ValidationOutcome::failed("volume type missing");
    };
    if let Some(requested) = status.handle.target.volume_type() {
        if volume_type != requested {
            return ValidationOutcome::failed(format!(
                "volume type {} differs from requested {}",
                volume_type, requested
            ));
        }
    }

    ValidationOutcome::ok(format!("{} GiB {}", size_gib, volume_type))
}
