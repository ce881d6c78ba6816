//! Recovery points and selectors
//!
//! A recovery point is owned by the external backup catalog. The pipeline
//! only references it; once returned by the locator it is never mutated.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RecoveryPointId;
use crate::kind::ResourceKind;

/// Lifecycle status reported by the catalog for a recovery point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryPointStatus {
    /// Backup finished and is restorable
    Completed,
    /// Backup still in progress
    Pending,
    /// Backup failed
    Failed,
    /// Backup passed its retention and can no longer be restored
    Expired,
}

impl RecoveryPointStatus {
    pub fn is_restorable(&self) -> bool {
        matches!(self, RecoveryPointStatus::Completed)
    }
}

/// A point-in-time backup of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPoint {
    /// Catalog identifier (may be an ARN)
    pub id: RecoveryPointId,

    /// Kind of resource this backup restores into
    pub kind: ResourceKind,

    /// Creation time of the backup
    pub created_at: DateTime<Utc>,

    /// Size of the backed-up resource in GiB, when the catalog reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_hint: Option<u64>,

    /// Catalog status
    pub status: RecoveryPointStatus,

    /// Vault or namespace holding the backup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,

    /// Tags attached to the backup
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl RecoveryPoint {
    /// Create a completed recovery point with no vault or tags
    pub fn completed(
        id: impl Into<String>,
        kind: ResourceKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecoveryPointId::new(id),
            kind,
            created_at,
            size_hint: None,
            status: RecoveryPointStatus::Completed,
            vault: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_size_hint(mut self, size_gib: u64) -> Self {
        self.size_hint = Some(size_gib);
        self
    }

    pub fn with_status(mut self, status: RecoveryPointStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_vault(mut self, vault: impl Into<String>) -> Self {
        self.vault = Some(vault.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Identifier the provisioning service resolves the backup by.
    ///
    /// ARN-style ids resolve to their last `:` segment; plain ids resolve
    /// to themselves.
    pub fn source_ref(&self) -> &str {
        let id = self.id.as_str();
        id.rsplit(':').next().unwrap_or(id)
    }
}

/// Filters that narrow a catalog query for one kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySelector {
    /// Only consider backups in this vault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,

    /// Only consider backups carrying all of these tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl RecoverySelector {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn in_vault(vault: impl Into<String>) -> Self {
        Self {
            vault: Some(vault.into()),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether a recovery point satisfies the vault and tag filters
    pub fn matches(&self, point: &RecoveryPoint) -> bool {
        if let Some(vault) = &self.vault {
            if point.vault.as_deref() != Some(vault.as_str()) {
                return false;
            }
        }
        self.tags
            .iter()
            .all(|(key, value)| point.tags.get(key) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(id: &str) -> RecoveryPoint {
        RecoveryPoint::completed(
            id,
            ResourceKind::Database,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_source_ref_strips_arn_prefix() {
        let arn = point("arn:aws:rds:us-east-1:123456789012:snapshot:awsbackup-job-1");
        assert_eq!(arn.source_ref(), "awsbackup-job-1");
        assert_eq!(point("snap-0abc").source_ref(), "snap-0abc");
    }

    #[test]
    fn test_selector_requires_vault_and_all_tags() {
        let selector = RecoverySelector::in_vault("Default").with_tag("Backup", "daily");

        let tagged = point("rp-1").with_vault("Default").with_tag("Backup", "daily");
        let wrong_vault = point("rp-2").with_vault("Archive").with_tag("Backup", "daily");
        let untagged = point("rp-3").with_vault("Default");

        assert!(selector.matches(&tagged));
        assert!(!selector.matches(&wrong_vault));
        assert!(!selector.matches(&untagged));
        assert!(RecoverySelector::any().matches(&untagged));
    }

    #[test]
    fn test_only_completed_points_are_restorable() {
        assert!(RecoveryPointStatus::Completed.is_restorable());
        assert!(!RecoveryPointStatus::Pending.is_restorable());
        assert!(!RecoveryPointStatus::Expired.is_restorable());
    }
}
