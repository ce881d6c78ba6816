//! Provisioners that run without a cloud backend
//!
//! `ScriptedProvisioner` replays a fixed status sequence, `FailingProvisioner`
//! rejects every restore, and `SimulatedProvisioner` tracks resources in
//! memory and becomes available after a set number of polls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use drill_types::status::{ENDPOINT_ATTR, SIZE_ATTR, TYPE_ATTR};
use drill_types::{ResourceId, ResourceKind, TargetParams};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{DrillError, Result};
use crate::provisioner::{ProviderStatus, ProvisionRequest, Provisioner};

/// Size every simulated volume snapshot and volume reports
pub const SIM_VOLUME_SIZE_GIB: u64 = 8;

fn id_prefix(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Database => "db",
        ResourceKind::Volume => "vol",
    }
}

/// Provisioner that replays a fixed script of statuses.
///
/// Each status query returns the next scripted status; the last one
/// repeats forever.
pub struct ScriptedProvisioner {
    kind: ResourceKind,
    resource_id: Option<ResourceId>,
    script: Mutex<VecDeque<ProviderStatus>>,
    requests: Mutex<Vec<ProvisionRequest>>,
    creates: AtomicU32,
    polls: AtomicU32,
}

impl ScriptedProvisioner {
    pub fn new(kind: ResourceKind, script: Vec<ProviderStatus>) -> Self {
        Self {
            kind,
            resource_id: None,
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            creates: AtomicU32::new(0),
            polls: AtomicU32::new(0),
        }
    }

    /// Available with `attributes` on the first poll
    pub fn always_available<K, V>(
        kind: ResourceKind,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(kind, vec![ProviderStatus::available(attributes)])
    }

    /// Pending for `pending_polls` polls, then available
    pub fn pending_then_available<K, V>(
        kind: ResourceKind,
        pending_polls: usize,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut script = vec![ProviderStatus::pending(); pending_polls];
        script.push(ProviderStatus::available(attributes));
        Self::new(kind, script)
    }

    /// Pending on every poll
    pub fn never_ready(kind: ResourceKind) -> Self {
        Self::new(kind, vec![ProviderStatus::pending()])
    }

    /// Return `id` from every create call instead of a generated one
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(ResourceId::new(id));
        self
    }

    pub fn create_calls(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order
    pub async fn requests(&self) -> Vec<ProvisionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    async fn create(&self, request: &ProvisionRequest) -> Result<ResourceId> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        Ok(self
            .resource_id
            .clone()
            .unwrap_or_else(|| ResourceId::generate(id_prefix(self.kind))))
    }

    async fn get_status(&self, id: &ResourceId) -> Result<ProviderStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().await;
        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        debug!(resource_id = %id, "Scripted status served");
        status.ok_or_else(|| DrillError::Provider(format!("no scripted status for {}", id)))
    }
}

/// Provisioner that rejects every restore
pub struct FailingProvisioner {
    kind: ResourceKind,
    reason: String,
    creates: AtomicU32,
}

impl FailingProvisioner {
    pub fn new(kind: ResourceKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            creates: AtomicU32::new(0),
        }
    }

    pub fn create_calls(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provisioner for FailingProvisioner {
    async fn create(&self, _request: &ProvisionRequest) -> Result<ResourceId> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Err(DrillError::provisioning(self.kind, self.reason.clone()))
    }

    async fn get_status(&self, id: &ResourceId) -> Result<ProviderStatus> {
        Err(DrillError::Provider(format!("unknown resource {}", id)))
    }
}

struct SimResource {
    request: ProvisionRequest,
    polls: u32,
}

/// Provisioner that behaves like a healthy provider.
///
/// Resources turn available after a fixed number of polls and report
/// attributes derived from their request.
pub struct SimulatedProvisioner {
    kind: ResourceKind,
    ready_after: u32,
    resources: DashMap<ResourceId, SimResource>,
}

impl SimulatedProvisioner {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            ready_after: 2,
            resources: DashMap::new(),
        }
    }

    /// Number of polls a resource stays pending, at least one
    pub fn with_ready_after(mut self, polls: u32) -> Self {
        self.ready_after = polls.max(1);
        self
    }

    fn attributes(request: &ProvisionRequest) -> Vec<(String, String)> {
        match &request.target.params {
            TargetParams::Database { .. } => vec![(
                ENDPOINT_ATTR.to_string(),
                format!("{}.sim.internal", request.name),
            )],
            TargetParams::Volume { volume_type, .. } => vec![
                (SIZE_ATTR.to_string(), SIM_VOLUME_SIZE_GIB.to_string()),
                (TYPE_ATTR.to_string(), volume_type.clone()),
            ],
        }
    }
}

#[async_trait]
impl Provisioner for SimulatedProvisioner {
    async fn create(&self, request: &ProvisionRequest) -> Result<ResourceId> {
        if request.target.kind() != self.kind {
            return Err(DrillError::provisioning(
                self.kind,
                format!("cannot create a {} here", request.target.kind()),
            ));
        }
        if self.resources.iter().any(|r| r.request.name == request.name) {
            return Err(DrillError::provisioning(
                self.kind,
                format!("name {} already in use", request.name),
            ));
        }

        let id = ResourceId::generate(id_prefix(self.kind));
        self.resources.insert(
            id.clone(),
            SimResource {
                request: request.clone(),
                polls: 0,
            },
        );
        Ok(id)
    }

    async fn get_status(&self, id: &ResourceId) -> Result<ProviderStatus> {
        let mut resource = self
            .resources
            .get_mut(id)
            .ok_or_else(|| DrillError::Provider(format!("unknown resource {}", id)))?;
        resource.polls += 1;

        if resource.polls < self.ready_after {
            Ok(ProviderStatus::pending())
        } else {
            Ok(ProviderStatus::available(Self::attributes(&resource.request)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::sample_volume_target;
    use drill_types::ResourceState;

    fn volume_request(name: &str) -> ProvisionRequest {
        let target = sample_volume_target();
        ProvisionRequest {
            source_ref: "snap-1".to_string(),
            name: name.to_string(),
            tags: target.labels.tags(),
            target,
        }
    }

    #[tokio::test]
    async fn test_scripted_repeats_last_status() {
        let provisioner = ScriptedProvisioner::pending_then_available(
            ResourceKind::Database,
            1,
            [("endpoint", "db.example.com")],
        );
        let id = ResourceId::new("h-1");

        assert_eq!(provisioner.get_status(&id).await.unwrap().state, ResourceState::Pending);
        assert_eq!(provisioner.get_status(&id).await.unwrap().state, ResourceState::Available);
        assert_eq!(provisioner.get_status(&id).await.unwrap().state, ResourceState::Available);
        assert_eq!(provisioner.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_simulated_volume_reports_request_type() {
        let provisioner = SimulatedProvisioner::new(ResourceKind::Volume).with_ready_after(2);
        let id = provisioner.create(&volume_request("restore-test-1")).await.unwrap();

        assert_eq!(provisioner.get_status(&id).await.unwrap().state, ResourceState::Pending);
        let ready = provisioner.get_status(&id).await.unwrap();
        assert_eq!(ready.state, ResourceState::Available);
        assert_eq!(ready.attributes.get(TYPE_ATTR).map(String::as_str), Some("gp3"));
        assert_eq!(ready.attributes.get(SIZE_ATTR).map(String::as_str), Some("8"));
    }

    #[tokio::test]
    async fn test_simulated_rejects_name_collision() {
        let provisioner = SimulatedProvisioner::new(ResourceKind::Volume);
        provisioner.create(&volume_request("restore-test-1")).await.unwrap();

        let again = provisioner.create(&volume_request("restore-test-1")).await;
        assert!(matches!(again, Err(DrillError::Provisioning { .. })));
    }

    #[tokio::test]
    async fn test_simulated_unknown_resource() {
        let provisioner = SimulatedProvisioner::new(ResourceKind::Database);
        let result = provisioner.get_status(&ResourceId::new("db-missing")).await;
        assert!(matches!(result, Err(DrillError::Provider(_))));
    }
}
