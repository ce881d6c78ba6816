//! Stage, kind and run results
//!
//! These are pure data. The constructors compute the derived flags so the
//! aggregation invariants hold for every value that can be built.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::kind::ResourceKind;

/// A pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Locate,
    Restore,
    Wait,
    Validate,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [Stage::Locate, Stage::Restore, Stage::Wait, Stage::Validate];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Locate => write!(f, "locate"),
            Stage::Restore => write!(f, "restore"),
            Stage::Wait => write!(f, "wait"),
            Stage::Validate => write!(f, "validate"),
        }
    }
}

/// Outcome of a stage or of a whole kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    Ok,
    Failed,
}

impl StageOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageOutcome::Ok)
    }
}

impl std::fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageOutcome::Ok => write!(f, "ok"),
            StageOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one attempted stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub detail: String,
    #[serde(rename = "elapsed_ms", with = "crate::duration_ms")]
    pub elapsed: Duration,
}

impl StageResult {
    pub fn ok(stage: Stage, detail: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Ok,
            detail: detail.into(),
            elapsed,
        }
    }

    pub fn failed(stage: Stage, detail: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Failed,
            detail: detail.into(),
            elapsed,
        }
    }
}

/// Outcome of one resource kind's pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KindResultRecord")]
pub struct KindResult {
    kind: ResourceKind,
    stages: Vec<StageResult>,
    overall: StageOutcome,
    #[serde(
        rename = "rto_ms",
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::duration_ms::option"
    )]
    rto: Option<Duration>,
    #[serde(
        rename = "rto_objective_ms",
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::duration_ms::option"
    )]
    rto_objective: Option<Duration>,
}

impl KindResult {
    /// Assemble a kind result from its attempted stages.
    ///
    /// `measured_rto` is kept only when the wait stage succeeded.
    pub fn new(
        kind: ResourceKind,
        stages: Vec<StageResult>,
        measured_rto: Option<Duration>,
        rto_objective: Option<Duration>,
    ) -> Self {
        let overall = if !stages.is_empty() && stages.iter().all(|s| s.outcome.is_ok()) {
            StageOutcome::Ok
        } else {
            StageOutcome::Failed
        };
        let wait_ok = stages
            .iter()
            .any(|s| s.stage == Stage::Wait && s.outcome.is_ok());

        Self {
            kind,
            stages,
            overall,
            rto: if wait_ok { measured_rto } else { None },
            rto_objective,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    pub fn overall(&self) -> StageOutcome {
        self.overall
    }

    pub fn passed(&self) -> bool {
        self.overall.is_ok()
    }

    /// Restore-start to ready delta, present whenever the wait succeeded
    pub fn measured_rto(&self) -> Option<Duration> {
        self.rto
    }

    /// The RTO this run demonstrates, present only when every stage passed
    pub fn rto(&self) -> Option<Duration> {
        if self.passed() {
            self.rto
        } else {
            None
        }
    }

    pub fn rto_objective(&self) -> Option<Duration> {
        self.rto_objective
    }

    /// Whether the demonstrated RTO is within the objective.
    ///
    /// `None` when there is no objective or no demonstrated RTO.
    pub fn objective_met(&self) -> Option<bool> {
        match (self.rto(), self.rto_objective) {
            (Some(rto), Some(objective)) => Some(rto <= objective),
            _ => None,
        }
    }

    /// The first failed stage, if any
    pub fn failed_stage(&self) -> Option<&StageResult> {
        self.stages.iter().find(|s| !s.outcome.is_ok())
    }
}

/// Wire form of [`KindResult`], checked against the constructor on the way in
#[derive(Deserialize)]
struct KindResultRecord {
    kind: ResourceKind,
    stages: Vec<StageResult>,
    overall: StageOutcome,
    #[serde(rename = "rto_ms", default, with = "crate::duration_ms::option")]
    rto: Option<Duration>,
    #[serde(rename = "rto_objective_ms", default, with = "crate::duration_ms::option")]
    rto_objective: Option<Duration>,
}

impl TryFrom<KindResultRecord> for KindResult {
    type Error = TypeError;

    fn try_from(record: KindResultRecord) -> Result<Self, Self::Error> {
        let result = KindResult::new(record.kind, record.stages, record.rto, record.rto_objective);
        if result.overall != record.overall {
            return Err(TypeError::InconsistentResult(format!(
                "{} overall is {} but its stages say {}",
                result.kind, record.overall, result.overall
            )));
        }
        if result.rto != record.rto {
            return Err(TypeError::InconsistentResult(format!(
                "{} carries an RTO without a successful wait",
                result.kind
            )));
        }
        Ok(result)
    }
}

/// The sole artifact of a drill run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RunSummaryRecord")]
pub struct RunSummary {
    kind_results: BTreeMap<ResourceKind, KindResult>,
    overall_pass: bool,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RunSummaryRecord {
    kind_results: BTreeMap<ResourceKind, KindResult>,
    overall_pass: bool,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl TryFrom<RunSummaryRecord> for RunSummary {
    type Error = TypeError;

    fn try_from(record: RunSummaryRecord) -> Result<Self, Self::Error> {
        if let Some((key, result)) = record
            .kind_results
            .iter()
            .find(|(key, result)| **key != result.kind())
        {
            return Err(TypeError::InconsistentResult(format!(
                "{} result filed under {}",
                result.kind(),
                key
            )));
        }
        let summary = RunSummary::new(
            record.kind_results.into_values(),
            record.started_at,
            record.finished_at,
        );
        if summary.overall_pass != record.overall_pass {
            return Err(TypeError::InconsistentResult(format!(
                "overall_pass is {} but the kind results say {}",
                record.overall_pass, summary.overall_pass
            )));
        }
        Ok(summary)
    }
}

impl RunSummary {
    pub fn new(
        results: impl IntoIterator<Item = KindResult>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let kind_results: BTreeMap<ResourceKind, KindResult> =
            results.into_iter().map(|r| (r.kind(), r)).collect();
        let overall_pass = kind_results.values().all(KindResult::passed);

        Self {
            kind_results,
            overall_pass,
            started_at,
            finished_at,
        }
    }

    pub fn kind_results(&self) -> &BTreeMap<ResourceKind, KindResult> {
        &self.kind_results
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&KindResult> {
        self.kind_results.get(&kind)
    }

    pub fn overall_pass(&self) -> bool {
        self.overall_pass
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Process exit status: 0 on pass, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.overall_pass {
            0
        } else {
            1
        }
    }
}
