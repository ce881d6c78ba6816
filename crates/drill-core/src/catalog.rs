//! Backup catalog interface
//!
//! The catalog is an external, read-only service. Implementations may apply
//! the selector server-side; the locator re-checks every returned entry.

use async_trait::async_trait;
use drill_types::{RecoveryPoint, RecoverySelector, ResourceKind};

use crate::error::Result;

/// Query interface over catalogued recovery points
#[async_trait]
pub trait BackupCatalog: Send + Sync {
    /// List recovery points of `kind` narrowed by `selector`
    async fn list_recovery_points(
        &self,
        kind: ResourceKind,
        selector: &RecoverySelector,
    ) -> Result<Vec<RecoveryPoint>>;
}
