//! Restore handles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ResourceId;
use crate::kind::ResourceKind;
use crate::recovery::RecoveryPoint;
use crate::target::TargetSpec;

/// A resource created by a restore, owned by the run that created it.
///
/// Once the run ends the handle is stale and must not be polled again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreHandle {
    /// Provider identifier of the new resource
    pub id: ResourceId,

    /// Kind of the new resource
    pub kind: ResourceKind,

    /// Recovery point the resource was restored from
    pub source: RecoveryPoint,

    /// Target the restore was requested with
    pub target: TargetSpec,

    /// When the restore call was issued
    pub started_at: DateTime<Utc>,
}
