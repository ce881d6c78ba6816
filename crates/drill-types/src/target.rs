//! Restore target specifications
//!
//! A target spec carries the kind-specific provisioning parameters and the
//! mandatory labeling policy that marks every restored resource as a
//! disposable test resource.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};
use crate::kind::ResourceKind;

/// Tag key naming why a resource exists
pub const PURPOSE_TAG: &str = "Purpose";

/// Tag key carrying the deletion hint
pub const DELETE_AFTER_TAG: &str = "DeleteAfter";

/// Labels applied to every restored resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPolicy {
    /// Value of the `Purpose` tag
    pub purpose: String,

    /// Date after which the resource may be deleted
    pub delete_after: NaiveDate,
}

impl LabelPolicy {
    /// Labels for a run on `run_date`, deletable `retain_days` later
    pub fn for_run(purpose: impl Into<String>, run_date: NaiveDate, retain_days: u64) -> Self {
        let delete_after = run_date
            .checked_add_days(Days::new(retain_days))
            .unwrap_or(run_date);
        Self {
            purpose: purpose.into(),
            delete_after,
        }
    }

    /// Render the policy as provider tags
    pub fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert(PURPOSE_TAG.to_string(), self.purpose.clone());
        tags.insert(
            DELETE_AFTER_TAG.to_string(),
            self.delete_after.format("%Y-%m-%d").to_string(),
        );
        tags
    }
}

/// Kind-specific provisioning parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetParams {
    Database {
        /// Instance class, e.g. `db.t3.micro`
        instance_class: String,
        /// Availability zone; provider default when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        availability_zone: Option<String>,
        /// Whether the restored instance gets a public endpoint
        #[serde(default)]
        publicly_accessible: bool,
    },
    Volume {
        /// Availability zone the volume is created in
        availability_zone: String,
        /// Volume type, e.g. `gp3`
        volume_type: String,
    },
}

impl TargetParams {
    pub fn kind(&self) -> ResourceKind {
        match self {
            TargetParams::Database { .. } => ResourceKind::Database,
            TargetParams::Volume { .. } => ResourceKind::Volume,
        }
    }
}

/// Everything the restorer needs besides the recovery point itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub params: TargetParams,
    pub labels: LabelPolicy,
}

impl TargetSpec {
    /// Build a target spec, rejecting empty mandatory parameters
    pub fn new(params: TargetParams, labels: LabelPolicy) -> Result<Self> {
        match &params {
            TargetParams::Database { instance_class, .. } if instance_class.trim().is_empty() => {
                return Err(TypeError::InvalidTarget(
                    "database instance class is empty".to_string(),
                ));
            }
            TargetParams::Volume {
                availability_zone,
                volume_type,
            } => {
                if availability_zone.trim().is_empty() {
                    return Err(TypeError::InvalidTarget(
                        "volume availability zone is empty".to_string(),
                    ));
                }
                if volume_type.trim().is_empty() {
                    return Err(TypeError::InvalidTarget("volume type is empty".to_string()));
                }
            }
            _ => {}
        }
        if labels.purpose.trim().is_empty() {
            return Err(TypeError::InvalidTarget("label purpose is empty".to_string()));
        }
        Ok(Self { params, labels })
    }

    pub fn kind(&self) -> ResourceKind {
        self.params.kind()
    }

    /// Check that this target can receive a restore of `kind`
    pub fn ensure_kind(&self, kind: ResourceKind) -> Result<()> {
        if self.kind() == kind {
            Ok(())
        } else {
            Err(TypeError::KindMismatch {
                kind: kind.to_string(),
                params: self.kind().to_string(),
            })
        }
    }

    /// The volume type requested, for volume targets
    pub fn volume_type(&self) -> Option<&str> {
        match &self.params {
            TargetParams::Volume { volume_type, .. } => Some(volume_type),
            TargetParams::Database { .. } => None,
        }
    }
}
