//! Remote clusters_mgmt API seam.
//!
//! The engine talks to the remote side only through [`UpgradeApi`]. The
//! production implementation is [`client::OcmClient`]; tests use an in-memory fake.

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::OcmClient;
pub use types::{
    ApiErrorBody, GateAgreement, NewUpgradePolicy, PolicyPage, PolicyState, PolicyStateInfo,
    ScheduleType, UpgradeKind, UpgradePolicy, VersionGate, VersionInfo,
};

/// The remote object whose version is being reconciled.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Cluster {
        cluster_id: String,
    },
    NodePool {
        cluster_id: String,
        node_pool_id: String,
    },
}

impl Target {
    pub fn cluster(cluster_id: impl Into<String>) -> Self {
        Self::Cluster {
            cluster_id: cluster_id.into(),
        }
    }

    pub fn node_pool(cluster_id: impl Into<String>, node_pool_id: impl Into<String>) -> Self {
        Self::NodePool {
            cluster_id: cluster_id.into(),
            node_pool_id: node_pool_id.into(),
        }
    }

    /// Owning cluster id. Gate agreements are always recorded against it.
    pub fn cluster_id(&self) -> &str {
        match self {
            Self::Cluster { cluster_id } | Self::NodePool { cluster_id, .. } => cluster_id,
        }
    }

    pub fn node_pool_id(&self) -> Option<&str> {
        match self {
            Self::Cluster { .. } => None,
            Self::NodePool { node_pool_id, .. } => Some(node_pool_id),
        }
    }

    /// REST path of the target relative to the clusters_mgmt root.
    pub fn path(&self) -> String {
        match self {
            Self::Cluster { cluster_id } => format!("clusters/{cluster_id}"),
            Self::NodePool {
                cluster_id,
                node_pool_id,
            } => format!("clusters/{cluster_id}/node_pools/{node_pool_id}"),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cluster { cluster_id } => write!(f, "cluster '{cluster_id}'"),
            Self::NodePool {
                cluster_id,
                node_pool_id,
            } => write!(f, "node pool '{node_pool_id}' of cluster '{cluster_id}'"),
        }
    }
}

/// Failure of a single remote call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiFailure {
    /// The API answered with a structured error document.
    #[error("{0}")]
    Api(ApiErrorBody),

    /// The request never produced a usable response (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered 2xx but the body could not be understood.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiFailure {
    /// Transport faults, throttling and server-side errors are worth retrying.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Api(body) => body.status == 429 || body.status >= 500,
            Self::Transport(_) => true,
            Self::Decode(_) => false,
        }
    }
}

/// Narrow interface over the remote upgrade API.
///
/// Every method is a single suspension point; no method retries internally.
#[async_trait]
pub trait UpgradeApi: Send + Sync {
    /// List one page (1-based) of upgrade policies scoped to the target.
    async fn list_policies(
        &self,
        target: &Target,
        page: u32,
        size: u32,
    ) -> Result<PolicyPage, ApiFailure>;

    /// Fetch the execution state of a policy.
    async fn get_policy_state(
        &self,
        target: &Target,
        policy_id: &str,
    ) -> Result<PolicyStateInfo, ApiFailure>;

    /// Remove a policy. The remote side treats this as cancellation.
    async fn delete_policy(&self, target: &Target, policy_id: &str) -> Result<(), ApiFailure>;

    /// Create a policy. With `dry_run` the request only validates gates.
    async fn create_policy(
        &self,
        target: &Target,
        policy: &NewUpgradePolicy,
        dry_run: bool,
    ) -> Result<UpgradePolicy, ApiFailure>;

    /// Record an agreement for one version gate on a cluster.
    async fn add_gate_agreement(
        &self,
        cluster_id: &str,
        gate_id: &str,
    ) -> Result<GateAgreement, ApiFailure>;

    /// Fetch a version record by its id (e.g. `openshift-v4.14.1`).
    async fn get_version(&self, version_id: &str) -> Result<VersionInfo, ApiFailure>;

    /// Version id currently installed on the target.
    async fn current_version(&self, target: &Target) -> Result<String, ApiFailure>;
}
