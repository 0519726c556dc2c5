//! Reads existing upgrade policies and their states from the remote side.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::UpgradeError;
use crate::ocm::{PolicyState, PolicyStateInfo, Target, UpgradeApi, UpgradePolicy};

/// Default page size when draining policy listings.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// An upgrade policy bundled with its observed execution state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingUpgrade {
    pub policy: UpgradePolicy,
    pub state: PolicyStateInfo,
}

impl ExistingUpgrade {
    pub const fn state(&self) -> PolicyState {
        self.state.value
    }

    pub fn id(&self) -> &str {
        &self.policy.id
    }

    pub fn version(&self) -> &str {
        &self.policy.version
    }

    pub const fn next_run(&self) -> Option<DateTime<Utc>> {
        self.policy.next_run
    }
}

/// Lists policies scoped to a target and fetches their states.
#[derive(Clone)]
pub struct RemoteUpgradeReader {
    api: Arc<dyn UpgradeApi>,
    page_size: u32,
}

impl RemoteUpgradeReader {
    pub fn new(api: Arc<dyn UpgradeApi>, page_size: u32) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
        }
    }

    /// List every policy in scope, draining all pages first.
    ///
    /// The server may serve fewer items per page than requested, so paging
    /// follows the reported `total` and only falls back to the short-page rule
    /// when no total is reported.
    ///
    /// Cluster targets only see platform-level policies; node pool targets only
    /// see policies of that node pool.
    pub async fn list_policies(&self, target: &Target) -> Result<Vec<UpgradePolicy>, UpgradeError> {
        let mut policies = Vec::new();
        let mut page = 1;

        loop {
            let response = self
                .api
                .list_policies(target, page, self.page_size)
                .await
                .map_err(|e| UpgradeError::remote("list upgrade policies", target, &e))?;

            let received = response.items.len();
            let reported_total = response.total as usize;
            policies.extend(response.items);

            let drained = if reported_total > 0 {
                policies.len() >= reported_total
            } else {
                received < self.page_size as usize
            };
            if received == 0 || drained {
                break;
            }
            page += 1;
        }

        let total = policies.len();
        policies.retain(|policy| in_scope(target, policy));
        debug!(
            "Found {} upgrade policies for {} ({} in scope)",
            total,
            target,
            policies.len()
        );
        Ok(policies)
    }

    /// Fetch the execution state of a single policy.
    pub async fn policy_state(
        &self,
        target: &Target,
        policy_id: &str,
    ) -> Result<PolicyStateInfo, UpgradeError> {
        self.api
            .get_policy_state(target, policy_id)
            .await
            .map_err(|e| {
                UpgradeError::remote(&format!("get state of upgrade policy '{policy_id}'"), target, &e)
            })
    }

    /// List policies in scope together with their states, in listing order.
    pub async fn scheduled_upgrades(
        &self,
        target: &Target,
    ) -> Result<Vec<ExistingUpgrade>, UpgradeError> {
        let policies = self.list_policies(target).await?;
        let mut upgrades = Vec::with_capacity(policies.len());

        for policy in policies {
            let state = self.policy_state(target, &policy.id).await?;
            debug!(
                "Found existing upgrade policy {} to {} in state {}",
                policy.id, policy.version, state.value
            );
            upgrades.push(ExistingUpgrade { policy, state });
        }

        Ok(upgrades)
    }
}

fn in_scope(target: &Target, policy: &UpgradePolicy) -> bool {
    match target {
        Target::Cluster { .. } => policy.upgrade_type.is_platform(),
        Target::NodePool { node_pool_id, .. } => policy
            .node_pool_id
            .as_deref()
            .is_none_or(|id| id == node_pool_id),
    }
}
