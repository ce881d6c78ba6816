//! Drill Types - Core types for restore verification
//!
//! Drill verifies that backups of managed infrastructure can actually be
//! restored within a recovery-time objective, not merely that they exist.
//! This crate holds the data model shared by the pipeline and its callers.
//!
//! ## Key Concepts
//!
//! - **RecoveryPoint**: A catalogued, restorable backup for one resource kind
//! - **RestoreHandle**: The live resource created from a recovery point
//! - **ResourceStatus**: A polled snapshot of the restored resource
//! - **StageResult / KindResult**: Per-stage and per-kind outcomes
//! - **RunSummary**: The single artifact a drill run produces
//!
//! ## Invariants
//!
//! - A [`KindResult`] is `Failed` iff any of its stages failed.
//! - A [`KindResult`] carries a measured RTO iff its wait stage succeeded.
//! - [`RunSummary::overall_pass`] is the conjunction of all kind outcomes.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod handle;
pub mod ids;
pub mod kind;
pub mod recovery;
pub mod result;
pub mod status;
pub mod target;

mod duration_ms;

// Re-export main types
pub use error::{Result, TypeError};
pub use handle::RestoreHandle;
pub use ids::{RecoveryPointId, ResourceId};
pub use kind::ResourceKind;
pub use recovery::{RecoveryPoint, RecoveryPointStatus, RecoverySelector};
pub use result::{KindResult, RunSummary, Stage, StageOutcome, StageResult};
pub use status::{ResourceState, ResourceStatus};
pub use target::{LabelPolicy, TargetParams, TargetSpec};
