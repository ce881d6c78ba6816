//! Per-kind run plans
//!
//! A plan binds one resource kind to everything the pipeline needs to
//! drill it: how to find its backups, where to restore them, which
//! provider to use, and how long to wait.

use std::sync::Arc;
use std::time::Duration;

use drill_types::{RecoverySelector, ResourceKind, TargetSpec};

use crate::error::{DrillError, Result};
use crate::provisioner::Provisioner;
use crate::waiter::PollPolicy;

/// Everything needed to drill one resource kind
#[derive(Clone)]
pub struct KindPlan {
    pub selector: RecoverySelector,
    pub target: TargetSpec,
    pub poll: PollPolicy,
    pub rto_objective: Option<Duration>,
    pub provisioner: Arc<dyn Provisioner>,
}

impl KindPlan {
    /// Plan with the kind's default cadence and no selector filters
    pub fn new(target: TargetSpec, provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            selector: RecoverySelector::any(),
            poll: PollPolicy::for_kind(target.kind()),
            target,
            rto_objective: None,
            provisioner,
        }
    }

    pub fn with_selector(mut self, selector: RecoverySelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_rto_objective(mut self, objective: Duration) -> Self {
        self.rto_objective = Some(objective);
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.target.kind()
    }

    /// Reject plans the pipeline could never complete
    pub fn check(&self) -> Result<()> {
        if !self.poll.is_usable() {
            return Err(DrillError::Config(format!(
                "{} poll policy needs a non-zero interval and at least one attempt",
                self.kind()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for KindPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindPlan")
            .field("kind", &self.kind())
            .field("selector", &self.selector)
            .field("poll", &self.poll)
            .field("rto_objective", &self.rto_objective)
            .finish_non_exhaustive()
    }
}
