//! Run progress events

use std::time::Duration;

use drill_types::{ResourceKind, Stage, StageResult};
use serde::{Deserialize, Serialize};

/// Progress notification broadcast while a run executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DrillEvent {
    /// A stage is about to run
    StageStarted { kind: ResourceKind, stage: Stage },

    /// A stage finished, successfully or not
    StageFinished { kind: ResourceKind, result: StageResult },

    /// A kind's pipeline is complete
    KindFinished {
        kind: ResourceKind,
        passed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rto_secs: Option<u64>,
    },
}

impl DrillEvent {
    pub fn kind(&self) -> ResourceKind {
        match self {
            DrillEvent::StageStarted { kind, .. }
            | DrillEvent::StageFinished { kind, .. }
            | DrillEvent::KindFinished { kind, .. } => *kind,
        }
    }

    pub(crate) fn kind_finished(kind: ResourceKind, passed: bool, rto: Option<Duration>) -> Self {
        DrillEvent::KindFinished {
            kind,
            passed,
            rto_secs: rto.map(|d| d.as_secs()),
        }
    }
}
