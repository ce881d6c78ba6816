//! Recovery point locator
//!
//! Picks the most recent restorable recovery point for a kind. Ties on
//! creation time resolve to the lexicographically smallest id.

use std::cmp::Ordering;
use std::sync::Arc;

use drill_types::{RecoveryPoint, RecoverySelector, ResourceKind};
use tracing::{debug, info, instrument};

use crate::catalog::BackupCatalog;
use crate::error::{DrillError, Result};

/// Read-only lookup of the latest recovery point
pub struct RecoveryPointLocator {
    catalog: Arc<dyn BackupCatalog>,
}

impl RecoveryPointLocator {
    pub fn new(catalog: Arc<dyn BackupCatalog>) -> Self {
        Self { catalog }
    }

    /// Locate the latest completed recovery point matching `selector`
    #[instrument(skip(self, kind, selector), fields(kind = %kind))]
    pub async fn locate(
        &self,
        kind: ResourceKind,
        selector: &RecoverySelector,
    ) -> Result<RecoveryPoint> {
        let candidates = self.catalog.list_recovery_points(kind, selector).await?;
        let total = candidates.len();
        debug!(kind = %kind, candidates = total, "Catalog returned recovery points");

        let latest = select_latest(candidates, kind, selector).ok_or_else(|| {
            DrillError::NotFound {
                kind,
                detail: format!("{} catalog entries, none completed and matching", total),
            }
        })?;

        info!(
            kind = %kind,
            recovery_point = %latest.id,
            created_at = %latest.created_at,
            "Located recovery point"
        );

        Ok(latest)
    }
}

/// Newest-first ordering with id as tie-breaker
fn recency(a: &RecoveryPoint, b: &RecoveryPoint) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Pick the latest restorable point of `kind` that `selector` accepts
pub fn select_latest(
    points: impl IntoIterator<Item = RecoveryPoint>,
    kind: ResourceKind,
    selector: &RecoverySelector,
) -> Option<RecoveryPoint> {
    points
        .into_iter()
        .filter(|p| p.kind == kind && p.status.is_restorable() && selector.matches(p))
        .min_by(recency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::InMemoryBackupCatalog;
    use chrono::{TimeZone, Utc};
    use drill_types::RecoveryPointStatus;

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_locate_picks_newest_completed() {
        let catalog = Arc::new(InMemoryBackupCatalog::new());
        catalog.add(RecoveryPoint::completed("rp-old", ResourceKind::Database, at(1)));
        catalog.add(RecoveryPoint::completed("rp-new", ResourceKind::Database, at(3)));
        catalog.add(
            RecoveryPoint::completed("rp-running", ResourceKind::Database, at(5))
                .with_status(RecoveryPointStatus::Pending),
        );
        catalog.add(RecoveryPoint::completed("vol-newest", ResourceKind::Volume, at(9)));

        let locator = RecoveryPointLocator::new(catalog);
        let point = locator
            .locate(ResourceKind::Database, &RecoverySelector::any())
            .await
            .unwrap();

        assert_eq!(point.id.as_str(), "rp-new");
    }

    #[tokio::test]
    async fn test_locate_breaks_ties_by_id() {
        let catalog = Arc::new(InMemoryBackupCatalog::new());
        catalog.add(RecoveryPoint::completed("snap-b", ResourceKind::Volume, at(2)));
        catalog.add(RecoveryPoint::completed("snap-a", ResourceKind::Volume, at(2)));

        let locator = RecoveryPointLocator::new(catalog);
        let point = locator
            .locate(ResourceKind::Volume, &RecoverySelector::any())
            .await
            .unwrap();

        assert_eq!(point.id.as_str(), "snap-a");
    }

    #[tokio::test]
    async fn test_locate_not_found() {
        let catalog = Arc::new(InMemoryBackupCatalog::new());
        catalog.add(
            RecoveryPoint::completed("snap-1", ResourceKind::Volume, at(2)).with_tag("Backup", "weekly"),
        );

        let locator = RecoveryPointLocator::new(catalog);
        let selector = RecoverySelector::any().with_tag("Backup", "daily");
        let result = locator.locate(ResourceKind::Volume, &selector).await;

        assert!(matches!(
            result,
            Err(DrillError::NotFound { kind: ResourceKind::Volume, .. })
        ));
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let catalog = Arc::new(InMemoryBackupCatalog::unavailable("throttled"));
        let locator = RecoveryPointLocator::new(catalog);

        let result = locator
            .locate(ResourceKind::Database, &RecoverySelector::any())
            .await;

        assert!(matches!(result, Err(DrillError::Catalog(_))));
    }
}
