//! Restorer - starts a restore from a recovery point
//!
//! The restorer only ever creates resources. A rejected create call is
//! terminal for the kind and is never retried, since a retry could leave
//! duplicate billable resources behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use drill_types::{RecoveryPoint, RestoreHandle, TargetSpec};
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::error::{DrillError, Result};
use crate::provisioner::{ProvisionRequest, Provisioner};

/// Default prefix for restored resource names
pub const DEFAULT_NAME_PREFIX: &str = "restore-test";

/// Issues restore calls against one kind's provisioner
pub struct Restorer {
    provisioner: Arc<dyn Provisioner>,
    clock: Arc<dyn Clock>,
    name_prefix: String,
}

impl Restorer {
    pub fn new(provisioner: Arc<dyn Provisioner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            provisioner,
            clock,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Build the provider request for a restore issued at `at`
    pub fn request_for(
        &self,
        point: &RecoveryPoint,
        target: &TargetSpec,
        at: DateTime<Utc>,
    ) -> ProvisionRequest {
        let name = format!("{}-{}", self.name_prefix, at.format("%Y%m%d-%H%M%S"));
        ProvisionRequest {
            source_ref: point.source_ref().to_string(),
            name,
            target: target.clone(),
            tags: target.labels.tags(),
        }
    }

    /// Start restoring `point` into `target`
    #[instrument(skip(self, point, target), fields(kind = %point.kind, recovery_point = %point.id))]
    pub async fn restore(&self, point: &RecoveryPoint, target: &TargetSpec) -> Result<RestoreHandle> {
        target
            .ensure_kind(point.kind)
            .map_err(|e| DrillError::provisioning(point.kind, e.to_string()))?;

        let started_at = self.clock.now();
        let request = self.request_for(point, target, started_at);

        let id = self.provisioner.create(&request).await.map_err(|e| {
            warn!(kind = %point.kind, error = %e, "Restore call rejected");
            match e {
                DrillError::Provisioning { .. } => e,
                other => DrillError::provisioning(point.kind, other.to_string()),
            }
        })?;

        info!(
            kind = %point.kind,
            resource_id = %id,
            name = %request.name,
            "Restore initiated"
        );

        Ok(RestoreHandle {
            id,
            kind: point.kind,
            source: point.clone(),
            target: target.clone(),
            started_at,
        })
    }
}
