//! # Drill Core - Restore-Verification Pipeline
//!
//! Drill proves that backups can be restored within a recovery-time
//! objective. For each resource kind it runs four stages in strict order:
//!
//! - **Locate**: find the latest completed recovery point ([`RecoveryPointLocator`])
//! - **Restore**: provision a new resource from it ([`Restorer`])
//! - **Wait**: poll the resource until it is ready ([`ReadinessWaiter`])
//! - **Validate**: check its reported attributes ([`validate`])
//!
//! The [`VerificationPipeline`] runs kinds concurrently, isolates their
//! failures, and aggregates everything into a [`RunSummary`].
//!
//! ## Architectural Boundaries
//!
//! - The **backup catalog** and **provisioning service** are external and
//!   reached only through [`BackupCatalog`] and [`Provisioner`].
//! - The pipeline only ever creates resources. Cleanup of restored test
//!   resources is the operator's job.
//! - Rendering a [`RunSummary`] is left to callers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drill_core::{
//!     sim::{sample_database_target, seed_catalog, InMemoryBackupCatalog, SimulatedProvisioner},
//!     CancelToken, KindPlan, TokioClock, VerificationPipeline,
//! };
//! use drill_types::{RecoverySelector, ResourceKind};
//!
//! # async fn example() -> drill_core::Result<()> {
//! let catalog = Arc::new(InMemoryBackupCatalog::new());
//! seed_catalog(&catalog, ResourceKind::Database, &RecoverySelector::any(), chrono::Utc::now());
//!
//! let mut pipeline = VerificationPipeline::new(catalog, Arc::new(TokioClock::new()));
//! pipeline.add_plan(KindPlan::new(
//!     sample_database_target(),
//!     Arc::new(SimulatedProvisioner::new(ResourceKind::Database)),
//! ))?;
//!
//! let summary = pipeline.run_all(&CancelToken::never()).await?;
//! std::process::exit(summary.exit_code().into());
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod cancel;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod events;
pub mod locator;
pub mod pipeline;
pub mod plan;
pub mod provisioner;
pub mod restorer;
pub mod sim;
pub mod validator;
pub mod waiter;

// Re-export main types
pub use cancel::{cancellation, CancelHandle, CancelToken};
pub use catalog::BackupCatalog;
pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{DrillError, Result};
pub use events::DrillEvent;
pub use locator::{select_latest, RecoveryPointLocator};
pub use pipeline::VerificationPipeline;
pub use plan::KindPlan;
pub use provisioner::{ProviderStatus, ProvisionRequest, Provisioner};
pub use restorer::Restorer;
pub use validator::{validate, ValidationOutcome};
pub use waiter::{PollBudget, PollPolicy, PollStep, ReadinessWaiter};

pub use drill_types::RunSummary;
