//! Recording in-memory implementation of [`UpgradeApi`] for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::ocm::{
    ApiErrorBody, ApiFailure, GateAgreement, NewUpgradePolicy, PolicyPage, PolicyState,
    PolicyStateInfo, Target, UpgradeApi, UpgradeKind, UpgradePolicy, VersionGate, VersionInfo,
};

/// A remote call observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List { page: u32 },
    GetState(String),
    Delete(String),
    DryRun(String),
    Create(String),
    Acknowledge(String),
    GetVersion(String),
}

impl Call {
    /// Calls that change remote state.
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Delete(_) | Self::Create(_) | Self::Acknowledge(_))
    }
}

#[derive(Default)]
struct State {
    policies: Vec<(UpgradePolicy, PolicyState)>,
    versions: HashMap<String, VersionInfo>,
    dry_run_error: Option<ApiFailure>,
    failing_deletes: Vec<String>,
    page_cap: Option<u32>,
    fail_acknowledge: bool,
    calls: Vec<Call>,
    next_id: u32,
}

pub struct FakeApi {
    now: DateTime<Utc>,
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            state: Mutex::new(State {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Seed an existing policy in the given state.
    pub fn add_policy(&self, policy: UpgradePolicy, state: PolicyState) {
        self.lock().policies.push((policy, state));
    }

    pub fn add_version(&self, version: VersionInfo) {
        self.lock().versions.insert(version.id.clone(), version);
    }

    /// Make the dry-run create answer with a missing-gate error carrying `gates`.
    pub fn require_gates(&self, gates: &[VersionGate]) {
        self.fail_dry_run(gate_error(serde_json::to_value(gates).unwrap()));
    }

    /// Serve at most `cap` policies per page, whatever size is requested.
    pub fn cap_page_size(&self, cap: u32) {
        self.lock().page_cap = Some(cap);
    }

    pub fn fail_dry_run(&self, failure: ApiFailure) {
        self.lock().dry_run_error = Some(failure);
    }

    pub fn fail_delete(&self, policy_id: &str) {
        self.lock().failing_deletes.push(policy_id.to_string());
    }

    pub fn fail_acknowledge(&self) {
        self.lock().fail_acknowledge = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn policy_ids(&self) -> Vec<String> {
        self.lock().policies.iter().map(|(p, _)| p.id.clone()).collect()
    }
}

/// Build a missing-gate error document like the one the API returns.
pub fn gate_error(details: serde_json::Value) -> ApiFailure {
    ApiFailure::Api(ApiErrorBody {
        status: 400,
        kind: "Error".to_string(),
        id: "400".to_string(),
        code: "CLUSTERS-MGMT-400".to_string(),
        reason: "There are missing version gate agreements for this cluster. See details."
            .to_string(),
        details: Some(details),
        operation_id: "8f2d2946-c4ef-4c2f-877b-c19eb17dc918".to_string(),
    })
}

/// A gate with the given id and acknowledgement requirement.
pub fn gate(id: &str, sts_only: bool) -> VersionGate {
    VersionGate {
        id: id.to_string(),
        version_raw_id_prefix: "4.14".to_string(),
        label: "api.openshift.com/ackme".to_string(),
        value: "4.14".to_string(),
        warning_message: "user gotta ack".to_string(),
        description: format!("deprecations for gate {id}"),
        documentation_url: "https://access.redhat.com/solutions/0000000".to_string(),
        sts_only,
    }
}

/// A platform-level manual policy.
pub fn policy(id: &str, version: &str, next_run: DateTime<Utc>) -> UpgradePolicy {
    UpgradePolicy {
        id: id.to_string(),
        cluster_id: "123".to_string(),
        version: version.to_string(),
        next_run: Some(next_run),
        upgrade_type: UpgradeKind::Osd,
        ..Default::default()
    }
}

fn not_found(what: &str) -> ApiFailure {
    ApiFailure::Api(ApiErrorBody {
        status: 404,
        reason: format!("{what} not found"),
        ..Default::default()
    })
}

#[async_trait]
impl UpgradeApi for FakeApi {
    async fn list_policies(
        &self,
        _target: &Target,
        page: u32,
        size: u32,
    ) -> Result<PolicyPage, ApiFailure> {
        let mut state = self.lock();
        state.calls.push(Call::List { page });
        let size = state.page_cap.map_or(size, |cap| size.min(cap));
        let start = ((page - 1) * size) as usize;
        let items: Vec<UpgradePolicy> = state
            .policies
            .iter()
            .skip(start)
            .take(size as usize)
            .map(|(p, _)| p.clone())
            .collect();
        Ok(PolicyPage {
            page,
            size: items.len() as u32,
            total: state.policies.len() as u32,
            items,
        })
    }

    async fn get_policy_state(
        &self,
        _target: &Target,
        policy_id: &str,
    ) -> Result<PolicyStateInfo, ApiFailure> {
        let mut state = self.lock();
        state.calls.push(Call::GetState(policy_id.to_string()));
        state
            .policies
            .iter()
            .find(|(p, _)| p.id == policy_id)
            .map(|(_, s)| PolicyStateInfo {
                value: *s,
                description: String::new(),
            })
            .ok_or_else(|| not_found("upgrade policy"))
    }

    async fn delete_policy(&self, _target: &Target, policy_id: &str) -> Result<(), ApiFailure> {
        let mut state = self.lock();
        state.calls.push(Call::Delete(policy_id.to_string()));
        if state.failing_deletes.iter().any(|id| id == policy_id) {
            return Err(ApiFailure::Transport("connection reset".to_string()));
        }
        state.policies.retain(|(p, _)| p.id != policy_id);
        Ok(())
    }

    async fn create_policy(
        &self,
        target: &Target,
        policy: &NewUpgradePolicy,
        dry_run: bool,
    ) -> Result<UpgradePolicy, ApiFailure> {
        let mut state = self.lock();
        if dry_run {
            state.calls.push(Call::DryRun(policy.version.clone()));
            if let Some(failure) = state.dry_run_error.clone() {
                return Err(failure);
            }
            return Ok(UpgradePolicy {
                version: policy.version.clone(),
                ..Default::default()
            });
        }

        state.calls.push(Call::Create(policy.version.clone()));
        state.next_id += 1;
        let created = UpgradePolicy {
            id: state.next_id.to_string(),
            cluster_id: target.cluster_id().to_string(),
            node_pool_id: target.node_pool_id().map(str::to_string),
            version: policy.version.clone(),
            schedule_type: policy.schedule_type,
            next_run: Some(self.now + Duration::minutes(1)),
            upgrade_type: match target {
                Target::Cluster { .. } => UpgradeKind::Osd,
                Target::NodePool { .. } => UpgradeKind::NodePool,
            },
        };
        state
            .policies
            .push((created.clone(), PolicyState::Scheduled));
        Ok(created)
    }

    async fn add_gate_agreement(
        &self,
        _cluster_id: &str,
        gate_id: &str,
    ) -> Result<GateAgreement, ApiFailure> {
        let mut state = self.lock();
        state.calls.push(Call::Acknowledge(gate_id.to_string()));
        if state.fail_acknowledge {
            return Err(ApiFailure::Api(ApiErrorBody {
                status: 500,
                reason: "internal error".to_string(),
                ..Default::default()
            }));
        }
        Ok(GateAgreement {
            id: format!("agreement-{gate_id}"),
            version_gate: VersionGate {
                id: gate_id.to_string(),
                ..Default::default()
            },
            creation_timestamp: Some(self.now),
        })
    }

    async fn get_version(&self, version_id: &str) -> Result<VersionInfo, ApiFailure> {
        let mut state = self.lock();
        state.calls.push(Call::GetVersion(version_id.to_string()));
        state
            .versions
            .get(version_id)
            .cloned()
            .ok_or_else(|| not_found("version"))
    }

    async fn current_version(&self, _target: &Target) -> Result<String, ApiFailure> {
        Ok("openshift-v4.14.0".to_string())
    }
}
