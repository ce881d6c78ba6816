//! In-memory backup catalog and seeding helpers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use drill_types::{RecoveryPoint, RecoveryPointId, RecoverySelector, ResourceKind};

use super::provisioner::SIM_VOLUME_SIZE_GIB;
use crate::catalog::BackupCatalog;
use crate::error::{DrillError, Result};

/// Backup catalog held in memory
pub struct InMemoryBackupCatalog {
    points: DashMap<RecoveryPointId, RecoveryPoint>,
    failure: Option<String>,
}

impl InMemoryBackupCatalog {
    pub fn new() -> Self {
        Self {
            points: DashMap::new(),
            failure: None,
        }
    }

    /// A catalog whose every query fails with `reason`
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            points: DashMap::new(),
            failure: Some(reason.into()),
        }
    }

    /// Add or replace a recovery point
    pub fn add(&self, point: RecoveryPoint) {
        self.points.insert(point.id.clone(), point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for InMemoryBackupCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackupCatalog for InMemoryBackupCatalog {
    async fn list_recovery_points(
        &self,
        kind: ResourceKind,
        selector: &RecoverySelector,
    ) -> Result<Vec<RecoveryPoint>> {
        if let Some(reason) = &self.failure {
            return Err(DrillError::Catalog(reason.clone()));
        }

        Ok(self
            .points
            .iter()
            .filter(|entry| entry.kind == kind && selector.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// Seed one completed recovery point of `kind` that `selector` accepts
pub fn seed_catalog(
    catalog: &InMemoryBackupCatalog,
    kind: ResourceKind,
    selector: &RecoverySelector,
    created_at: DateTime<Utc>,
) -> RecoveryPoint {
    let mut point = RecoveryPoint::completed(
        format!("sim:{}:{}-{}", kind, kind, created_at.format("%Y%m%d%H%M%S")),
        kind,
        created_at,
    );
    if let Some(vault) = &selector.vault {
        point = point.with_vault(vault.clone());
    }
    for (key, value) in &selector.tags {
        point = point.with_tag(key.clone(), value.clone());
    }
    if kind == ResourceKind::Volume {
        point = point.with_size_hint(SIM_VOLUME_SIZE_GIB);
    }

    catalog.add(point.clone());
    point
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_seeded_point_matches_selector() {
        let catalog = InMemoryBackupCatalog::new();
        let selector = RecoverySelector::in_vault("Default").with_tag("Backup", "daily");
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();

        let seeded = seed_catalog(&catalog, ResourceKind::Volume, &selector, created);

        let listed = catalog
            .list_recovery_points(ResourceKind::Volume, &selector)
            .await
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(listed, vec![seeded.clone()]);
        assert_eq!(seeded.source_ref(), "volume-20240501030000");
        assert_eq!(seeded.size_hint, Some(SIM_VOLUME_SIZE_GIB));

        let other_kind = catalog
            .list_recovery_points(ResourceKind::Database, &RecoverySelector::any())
            .await
            .unwrap();
        assert!(other_kind.is_empty());
    }
}
