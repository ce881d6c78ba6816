//! Pipeline orchestrator
//!
//! Runs locate, restore, wait and validate for each requested kind. Kinds
//! run concurrently and in isolation: any error or panic inside a kind's
//! stages becomes a failed [`StageResult`] for that kind and nothing else.
//! The only error `run` returns is a configuration error, raised before any
//! stage executes.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use drill_types::{KindResult, ResourceKind, RunSummary, Stage, StageResult};
use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::cancel::CancelToken;
use crate::catalog::BackupCatalog;
use crate::clock::{elapsed_between, Clock};
use crate::error::{DrillError, Result};
use crate::events::DrillEvent;
use crate::locator::RecoveryPointLocator;
use crate::plan::KindPlan;
use crate::restorer::{Restorer, DEFAULT_NAME_PREFIX};
use crate::validator::{validate, ValidationOutcome};
use crate::waiter::ReadinessWaiter;

const EVENT_CAPACITY: usize = 256;

/// What a stage body produced
enum StageOutput<T> {
    /// Stage succeeded with a value and a detail line
    Done(T, String),
    /// A component raised an error
    Failed(DrillError),
    /// The stage ran but its verdict was negative
    Rejected(String),
}

/// Restore-verification pipeline over a set of kind plans
pub struct VerificationPipeline {
    catalog: Arc<dyn BackupCatalog>,
    clock: Arc<dyn Clock>,
    plans: BTreeMap<ResourceKind, KindPlan>,
    name_prefix: String,
    event_tx: broadcast::Sender<DrillEvent>,
}

impl VerificationPipeline {
    pub fn new(catalog: Arc<dyn BackupCatalog>, clock: Arc<dyn Clock>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog,
            clock,
            plans: BTreeMap::new(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            event_tx,
        }
    }

    /// Prefix for the names of restored resources
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Register the plan for a kind; one plan per kind
    pub fn add_plan(&mut self, plan: KindPlan) -> Result<()> {
        let kind = plan.kind();
        if self.plans.contains_key(&kind) {
            return Err(DrillError::Config(format!("duplicate plan for {}", kind)));
        }
        self.plans.insert(kind, plan);
        Ok(())
    }

    pub fn kinds(&self) -> BTreeSet<ResourceKind> {
        self.plans.keys().copied().collect()
    }

    /// Receive progress events for subsequent runs
    pub fn subscribe(&self) -> broadcast::Receiver<DrillEvent> {
        self.event_tx.subscribe()
    }

    /// Run every kind that has a plan
    pub async fn run_all(&self, cancel: &CancelToken) -> Result<RunSummary> {
        self.run(&self.kinds(), cancel).await
    }

    /// Drill each kind in `kinds` and aggregate the outcome.
    ///
    /// Fails only when a kind has no usable plan; in that case no stage of
    /// any kind is attempted.
    #[instrument(skip(self, cancel))]
    pub async fn run(&self, kinds: &BTreeSet<ResourceKind>, cancel: &CancelToken) -> Result<RunSummary> {
        let mut selected = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let plan = self
                .plans
                .get(kind)
                .ok_or_else(|| DrillError::Config(format!("no plan configured for {}", kind)))?;
            plan.check()?;
            selected.push(plan);
        }

        let started_at = self.clock.now();
        info!(kinds = selected.len(), "Starting restore drill");

        let results = join_all(selected.into_iter().map(|plan| self.run_kind(plan, cancel))).await;

        let summary = RunSummary::new(results, started_at, self.clock.now());
        info!(overall_pass = summary.overall_pass(), "Restore drill finished");
        Ok(summary)
    }

    #[instrument(skip(self, plan, cancel), fields(kind = %plan.kind()))]
    async fn run_kind(&self, plan: &KindPlan, cancel: &CancelToken) -> KindResult {
        let kind = plan.kind();
        let mut stages = Vec::with_capacity(Stage::ORDER.len());

        let locator = RecoveryPointLocator::new(self.catalog.clone());
        let point = self
            .run_stage(kind, Stage::Locate, cancel, &mut stages, async {
                match locator.locate(kind, &plan.selector).await {
                    Ok(point) => {
                        let detail = format!(
                            "recovery point {} created {}",
                            point.id,
                            point.created_at.to_rfc3339()
                        );
                        StageOutput::Done(point, detail)
                    }
                    Err(e) => StageOutput::Failed(e),
                }
            })
            .await;
        let Some(point) = point else {
            return self.finish(plan, stages, None);
        };

        let restorer = Restorer::new(plan.provisioner.clone(), self.clock.clone())
            .with_name_prefix(self.name_prefix.clone());
        let handle = self
            .run_stage(kind, Stage::Restore, cancel, &mut stages, async {
                match restorer.restore(&point, &plan.target).await {
                    Ok(handle) => {
                        let detail = format!("restoring {} from {}", handle.id, point.source_ref());
                        StageOutput::Done(handle, detail)
                    }
                    Err(e) => StageOutput::Failed(e),
                }
            })
            .await;
        let Some(handle) = handle else {
            return self.finish(plan, stages, None);
        };

        let waiter = ReadinessWaiter::new(plan.provisioner.clone(), self.clock.clone());
        let status = self
            .run_stage(kind, Stage::Wait, cancel, &mut stages, async {
                match waiter.wait_until_ready(&handle, &plan.poll, cancel).await {
                    Ok(status) => {
                        let detail = format!("{} is {}", handle.id, status.state);
                        StageOutput::Done(status, detail)
                    }
                    Err(e) => StageOutput::Failed(e),
                }
            })
            .await;
        let Some(status) = status else {
            return self.finish(plan, stages, None);
        };
        let rto = elapsed_between(handle.started_at, self.clock.now());

        self.run_stage(kind, Stage::Validate, cancel, &mut stages, async {
            match validate(&status) {
                ValidationOutcome::Ok { summary } => StageOutput::Done((), summary),
                ValidationOutcome::Failed { reason } => StageOutput::Rejected(reason),
            }
        })
        .await;

        self.finish(plan, stages, Some(rto))
    }

    /// Run one stage body, timing it and recording its result.
    ///
    /// Returns the stage value on success. A cancelled run records the
    /// stage as failed without running the body.
    async fn run_stage<T, F>(
        &self,
        kind: ResourceKind,
        stage: Stage,
        cancel: &CancelToken,
        stages: &mut Vec<StageResult>,
        body: F,
    ) -> Option<T>
    where
        F: Future<Output = StageOutput<T>>,
    {
        if cancel.is_cancelled() {
            warn!(kind = %kind, stage = %stage, "Run cancelled, stage not started");
            let result = StageResult::failed(stage, DrillError::Cancelled.stage_detail(), Duration::ZERO);
            self.emit(DrillEvent::StageFinished {
                kind,
                result: result.clone(),
            });
            stages.push(result);
            return None;
        }

        self.emit(DrillEvent::StageStarted { kind, stage });
        let start = self.clock.now();
        let output = match AssertUnwindSafe(body).catch_unwind().await {
            Ok(output) => output,
            Err(payload) => StageOutput::Failed(DrillError::Panicked(panic_message(payload))),
        };
        let elapsed = elapsed_between(start, self.clock.now());

        let (value, result) = match output {
            StageOutput::Done(value, detail) => {
                info!(kind = %kind, stage = %stage, elapsed_ms = elapsed.as_millis() as u64, "Stage passed");
                (Some(value), StageResult::ok(stage, detail, elapsed))
            }
            StageOutput::Failed(e) => {
                warn!(kind = %kind, stage = %stage, error = %e, "Stage failed");
                (None, StageResult::failed(stage, e.stage_detail(), elapsed))
            }
            StageOutput::Rejected(reason) => {
                warn!(kind = %kind, stage = %stage, reason = %reason, "Stage rejected");
                (None, StageResult::failed(stage, reason, elapsed))
            }
        };

        self.emit(DrillEvent::StageFinished {
            kind,
            result: result.clone(),
        });
        stages.push(result);
        value
    }

    fn finish(&self, plan: &KindPlan, stages: Vec<StageResult>, rto: Option<Duration>) -> KindResult {
        let result = KindResult::new(plan.kind(), stages, rto, plan.rto_objective);

        if result.passed() {
            info!(
                kind = %result.kind(),
                rto_secs = result.rto().map(|d| d.as_secs()),
                objective_met = ?result.objective_met(),
                "Kind passed"
            );
        } else {
            warn!(
                kind = %result.kind(),
                failed_stage = ?result.failed_stage().map(|s| s.stage),
                "Kind failed"
            );
        }

        self.emit(DrillEvent::kind_finished(result.kind(), result.passed(), result.rto()));
        result
    }

    fn emit(&self, event: DrillEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
