//! Wire types for the clusters_mgmt upgrade policy, version and gate endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution state of an upgrade policy. Owned by the remote side.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PolicyState {
    Pending,
    Scheduled,
    Started,
    Delayed,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for PolicyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Started => write!(f, "started"),
            Self::Delayed => write!(f, "delayed"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Distinguishes platform-level upgrades from node-pool-level ones.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum UpgradeKind {
    #[serde(rename = "OSD")]
    Osd,
    ControlPlane,
    NodePool,
    #[default]
    #[serde(other)]
    Other,
}

impl UpgradeKind {
    /// Platform-level upgrades move the cluster itself, not one of its node pools.
    pub const fn is_platform(&self) -> bool {
        matches!(self, Self::Osd | Self::ControlPlane)
    }
}

/// Schedule kind of an upgrade policy. This engine only ever creates manual ones.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    #[default]
    Manual,
    Automatic,
}

/// An upgrade policy as listed by the remote API.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradePolicy {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_pool_id: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub schedule_type: ScheduleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub upgrade_type: UpgradeKind,
}

/// Request body for creating an upgrade policy (real or dry-run).
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NewUpgradePolicy {
    pub schedule_type: ScheduleType,
    pub version: String,
}

impl NewUpgradePolicy {
    /// A manual policy targeting the given raw version id (e.g. "4.14.1").
    pub fn manual(version: impl Into<String>) -> Self {
        Self {
            schedule_type: ScheduleType::Manual,
            version: version.into(),
        }
    }
}

/// One page of a policy listing.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PolicyPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub items: Vec<UpgradePolicy>,
}

/// State document of an upgrade policy.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PolicyStateInfo {
    pub value: PolicyState,
    #[serde(default)]
    pub description: String,
}

/// A compliance gate the platform requires before crossing a version boundary.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionGate {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version_raw_id_prefix: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub warning_message: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub documentation_url: String,
    #[serde(default)]
    pub sts_only: bool,
}

impl VersionGate {
    /// STS-only gates apply automatically and never need operator consent.
    pub const fn requires_acknowledgement(&self) -> bool {
        !self.sts_only
    }
}

/// A durable agreement between a cluster and a version gate.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GateAgreement {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version_gate: VersionGate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Request body for `POST clusters/{id}/gate_agreements`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NewGateAgreement {
    pub version_gate: GateRef,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GateRef {
    pub id: String,
}

impl NewGateAgreement {
    pub fn for_gate(gate_id: impl Into<String>) -> Self {
        Self {
            version_gate: GateRef { id: gate_id.into() },
        }
    }
}

/// A version record from `GET versions/{id}`.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub raw_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_group: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    /// Platform-enablement flag: eligible for the managed-service upgrade catalog.
    #[serde(default)]
    pub rosa_enabled: bool,
    #[serde(default)]
    pub hosted_control_plane_enabled: bool,
    #[serde(default)]
    pub available_upgrades: Vec<String>,
}

/// Reference to a version embedded in a cluster or node pool document.
#[derive(Deserialize, Clone, Debug, Default)]
pub(crate) struct VersionRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub raw_id: String,
}

/// The subset of a cluster or node pool document the engine reads.
#[derive(Deserialize, Clone, Debug, Default)]
pub(crate) struct VersionedResource {
    #[serde(default)]
    pub version: Option<VersionRef>,
}

/// Node pool policies embed their state in the policy document.
#[derive(Deserialize, Clone, Debug)]
pub(crate) struct PolicyWithState {
    pub state: PolicyStateInfo,
}

/// Structured error document returned by the API on non-2xx responses.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ApiErrorBody {
    /// HTTP status of the response. Not part of the document itself.
    #[serde(skip)]
    pub status: u16,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default)]
    pub operation_id: String,
}

impl std::fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status {}", self.status)?;
        if !self.code.is_empty() {
            write!(f, ", code '{}'", self.code)?;
        }
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        if !self.operation_id.is_empty() {
            write!(f, " (operation id '{}')", self.operation_id)?;
        }
        Ok(())
    }
}
