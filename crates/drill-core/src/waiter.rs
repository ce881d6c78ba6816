//! Readiness waiter - bounded polling of a restored resource
//!
//! Polling runs on a fixed interval, not exponential backoff: restore
//! completion times are well bounded per kind, and the interval and attempt
//! budget are tuned per kind instead.
//!
//! Each attempt sleeps one interval, then polls once. With `max_attempts`
//! of N and a provider stuck in `Pending`, exactly N polls happen before
//! [`DrillError::Timeout`].

use std::sync::Arc;
use std::time::Duration;

use drill_types::{ResourceKind, ResourceState, ResourceStatus, RestoreHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::error::{DrillError, Result};
use crate::provisioner::{Provisioner, FAILURE_REASON_ATTR};

/// Poll cadence for one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay before each poll
    pub interval: Duration,

    /// Maximum number of polls
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Default cadence for a kind.
    ///
    /// Database restores take roughly ten minutes, volumes one or two.
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Database => Self::new(Duration::from_secs(30), 40),
            ResourceKind::Volume => Self::new(Duration::from_secs(15), 40),
        }
    }

    /// Longest time a wait can take
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }

    pub fn is_usable(&self) -> bool {
        !self.interval.is_zero() && self.max_attempts > 0
    }
}

/// What the waiter does after observing a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Terminal success
    Ready,
    /// Terminal provider failure
    Failed,
    /// Still pending, budget left
    Continue,
    /// Still pending, budget spent
    Exhausted,
}

/// Attempt accounting for one wait
#[derive(Debug, Clone)]
pub struct PollBudget {
    max_attempts: u32,
    attempts: u32,
}

impl PollBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn has_remaining(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Record one poll and decide the next step
    pub fn observe(&mut self, state: ResourceState) -> PollStep {
        self.attempts += 1;
        if state.is_terminal() {
            return match state {
                ResourceState::Available => PollStep::Ready,
                _ => PollStep::Failed,
            };
        }
        if self.has_remaining() {
            PollStep::Continue
        } else {
            PollStep::Exhausted
        }
    }
}

/// Polls a restore handle until it is ready, failed, or out of budget
pub struct ReadinessWaiter {
    provisioner: Arc<dyn Provisioner>,
    clock: Arc<dyn Clock>,
}

impl ReadinessWaiter {
    pub fn new(provisioner: Arc<dyn Provisioner>, clock: Arc<dyn Clock>) -> Self {
        Self { provisioner, clock }
    }

    /// Wait until `handle` reaches a terminal state.
    ///
    /// Cancelling `cancel` interrupts the current sleep or status query and
    /// ends the wait with [`DrillError::Cancelled`]; the provider-side
    /// restore is left running.
    #[instrument(skip(self, handle, cancel), fields(kind = %handle.kind, resource_id = %handle.id))]
    pub async fn wait_until_ready(
        &self,
        handle: &RestoreHandle,
        policy: &PollPolicy,
        cancel: &CancelToken,
    ) -> Result<ResourceStatus> {
        let mut budget = PollBudget::new(policy.max_attempts);

        while budget.has_remaining() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(
                        resource_id = %handle.id,
                        attempts = budget.attempts(),
                        "Wait cancelled; restored resource left in place"
                    );
                    return Err(DrillError::Cancelled);
                }
                _ = self.clock.sleep(policy.interval) => {}
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(
                        resource_id = %handle.id,
                        attempts = budget.attempts(),
                        "Status query cancelled; restored resource left in place"
                    );
                    return Err(DrillError::Cancelled);
                }
                polled = self.provisioner.get_status(&handle.id) => polled,
            };
            let reported = polled.map_err(|e| match e {
                DrillError::Provider(_) => e,
                other => DrillError::Provider(other.to_string()),
            })?;

            let step = budget.observe(reported.state);
            debug!(
                resource_id = %handle.id,
                attempt = budget.attempts(),
                state = %reported.state,
                "Polled restore status"
            );

            match step {
                PollStep::Continue => continue,
                PollStep::Ready => {
                    info!(
                        resource_id = %handle.id,
                        attempts = budget.attempts(),
                        "Restored resource is available"
                    );
                    return Ok(ResourceStatus {
                        handle: handle.clone(),
                        state: reported.state,
                        attributes: reported.attributes,
                    });
                }
                PollStep::Failed => {
                    let reason = reported
                        .attributes
                        .get(FAILURE_REASON_ATTR)
                        .cloned()
                        .unwrap_or_else(|| "provider reported a failed state".to_string());
                    return Err(DrillError::ProvisioningFailed {
                        resource_id: handle.id.clone(),
                        reason,
                    });
                }
                PollStep::Exhausted => break,
            }
        }

        Err(DrillError::Timeout {
            resource_id: handle.id.clone(),
            attempts: budget.attempts(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancellation;
    use crate::clock::{elapsed_between, ManualClock};
    use crate::provisioner::ProviderStatus;
    use crate::sim::{sample_database_target, ScriptedProvisioner};
    use chrono::{TimeZone, Utc};
    use drill_types::{RecoveryPoint, ResourceId};

    fn handle(clock: &ManualClock) -> RestoreHandle {
        RestoreHandle {
            id: ResourceId::new("h-1"),
            kind: ResourceKind::Database,
            source: RecoveryPoint::completed(
                "rp-1",
                ResourceKind::Database,
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ),
            target: sample_database_target(),
            started_at: clock.now(),
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_budget_transitions() {
        let mut budget = PollBudget::new(2);
        assert_eq!(budget.observe(ResourceState::Pending), PollStep::Continue);
        assert_eq!(budget.observe(ResourceState::Pending), PollStep::Exhausted);
        assert!(!budget.has_remaining());

        let mut budget = PollBudget::new(5);
        assert_eq!(budget.observe(ResourceState::Failed), PollStep::Failed);
        let mut budget = PollBudget::new(1);
        assert_eq!(budget.observe(ResourceState::Available), PollStep::Ready);
    }

    #[tokio::test]
    async fn test_ready_after_pending() {
        let clock = clock();
        let provisioner = Arc::new(ScriptedProvisioner::new(
            ResourceKind::Database,
            vec![
                ProviderStatus::pending(),
                ProviderStatus::available([("endpoint", "db.example.com")]),
            ],
        ));
        let waiter = ReadinessWaiter::new(provisioner.clone(), clock.clone());
        let handle = handle(&clock);
        let policy = PollPolicy::new(Duration::from_secs(30), 40);

        let status = waiter
            .wait_until_ready(&handle, &policy, &CancelToken::never())
            .await
            .unwrap();

        assert_eq!(status.state, ResourceState::Available);
        assert_eq!(status.attribute("endpoint"), Some("db.example.com"));
        assert_eq!(provisioner.status_calls(), 2);
        assert_eq!(
            elapsed_between(handle.started_at, clock.now()),
            Duration::from_secs(60)
        );
    }

    #[tokio::test]
    async fn test_timeout_after_exactly_max_attempts() {
        for max_attempts in [1, 3, 7] {
            let clock = clock();
            let provisioner = Arc::new(ScriptedProvisioner::never_ready(ResourceKind::Database));
            let waiter = ReadinessWaiter::new(provisioner.clone(), clock.clone());
            let policy = PollPolicy::new(Duration::from_secs(10), max_attempts);

            let result = waiter
                .wait_until_ready(&handle(&clock), &policy, &CancelToken::never())
                .await;

            match result {
                Err(DrillError::Timeout { attempts, .. }) => assert_eq!(attempts, max_attempts),
                other => panic!("expected timeout, got {:?}", other),
            }
            assert_eq!(provisioner.status_calls(), max_attempts);
            assert_eq!(clock.sleep_count(), max_attempts);
        }
    }

    #[tokio::test]
    async fn test_provider_failure_is_terminal() {
        let clock = clock();
        let provisioner = Arc::new(ScriptedProvisioner::new(
            ResourceKind::Database,
            vec![ProviderStatus::pending(), ProviderStatus::failed("incompatible-parameters")],
        ));
        let waiter = ReadinessWaiter::new(provisioner.clone(), clock.clone());
        let policy = PollPolicy::new(Duration::from_secs(30), 40);

        let result = waiter
            .wait_until_ready(&handle(&clock), &policy, &CancelToken::never())
            .await;

        match result {
            Err(DrillError::ProvisioningFailed { reason, .. }) => {
                assert_eq!(reason, "incompatible-parameters")
            }
            other => panic!("expected provisioning failure, got {:?}", other),
        }
        assert_eq!(provisioner.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_wait_stops_polling() {
        let clock = clock();
        let provisioner = Arc::new(ScriptedProvisioner::never_ready(ResourceKind::Database));
        let waiter = ReadinessWaiter::new(provisioner.clone(), clock.clone());
        let policy = PollPolicy::new(Duration::from_secs(30), 40);
        let (cancel, token) = cancellation();
        cancel.cancel();

        let result = waiter.wait_until_ready(&handle(&clock), &policy, &token).await;

        assert!(matches!(result, Err(DrillError::Cancelled)));
        assert_eq!(provisioner.status_calls(), 0);
    }

    #[tokio::test]
    async fn test_status_query_error_ends_wait_as_provider_error() {
        let clock = clock();
        let provisioner = Arc::new(crate::sim::SimulatedProvisioner::new(ResourceKind::Database));
        let waiter = ReadinessWaiter::new(provisioner, clock.clone());
        let policy = PollPolicy::new(Duration::from_secs(30), 40);

        let result = waiter
            .wait_until_ready(&handle(&clock), &policy, &CancelToken::never())
            .await;

        match result {
            Err(DrillError::Provider(detail)) => assert!(detail.contains("h-1")),
            other => panic!("expected provider error, got {:?}", other),
        }
        assert_eq!(clock.sleep_count(), 1);
    }

    #[test]
    fn test_default_policies_favour_longer_database_waits() {
        let db = PollPolicy::for_kind(ResourceKind::Database);
        let vol = PollPolicy::for_kind(ResourceKind::Volume);
        assert!(db.budget() > vol.budget());
        assert_eq!(db.budget(), Duration::from_secs(1200));
        assert!(!PollPolicy::new(Duration::ZERO, 3).is_usable());
    }
}
