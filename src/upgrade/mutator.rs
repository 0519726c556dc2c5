//! Creation and cancellation of upgrade policies.

use std::sync::Arc;

use tracing::info;

use super::version::TargetVersion;
use crate::error::UpgradeError;
use crate::ocm::{NewUpgradePolicy, Target, UpgradeApi, UpgradePolicy};

#[derive(Clone)]
pub struct UpgradePolicyMutator {
    api: Arc<dyn UpgradeApi>,
}

impl UpgradePolicyMutator {
    pub fn new(api: Arc<dyn UpgradeApi>) -> Self {
        Self { api }
    }

    /// Schedule a manual upgrade of `target` to `version`.
    pub async fn create(
        &self,
        target: &Target,
        version: &TargetVersion,
    ) -> Result<UpgradePolicy, UpgradeError> {
        let policy = self
            .api
            .create_policy(target, &NewUpgradePolicy::manual(version.raw_id()), false)
            .await
            .map_err(|e| UpgradeError::remote("create upgrade policy", target, &e))?;

        info!(
            "Scheduled upgrade of {} to {} (policy {}, next run {})",
            target,
            version,
            policy.id,
            policy
                .next_run
                .map_or_else(|| "unscheduled".to_string(), |t| t.to_rfc3339())
        );
        Ok(policy)
    }

    /// Cancel a policy by removing it.
    ///
    /// Only legal before the policy reaches `started`/`delayed`; callers check.
    pub async fn cancel(&self, target: &Target, policy: &UpgradePolicy) -> Result<(), UpgradeError> {
        self.api
            .delete_policy(target, &policy.id)
            .await
            .map_err(|e| {
                UpgradeError::remote(&format!("delete upgrade policy '{}'", policy.id), target, &e)
            })?;

        info!(
            "Cancelled upgrade policy {} to {} for {}",
            policy.id, policy.version, target
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocm::{PolicyState, ScheduleType};
    use crate::upgrade::fake::{Call, FakeApi, policy};
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_manual_policy() {
        let api = Arc::new(FakeApi::new(Utc::now()));
        let mutator = UpgradePolicyMutator::new(api.clone());
        let version = TargetVersion::parse("openshift-v4.14.1", None).unwrap();
        let created = mutator
            .create(&Target::cluster("123"), &version)
            .await
            .unwrap();
        assert_eq!(created.version, "4.14.1");
        assert_eq!(created.schedule_type, ScheduleType::Manual);
        assert_eq!(api.calls(), vec![Call::Create("4.14.1".to_string())]);
    }

    #[tokio::test]
    async fn test_cancel_removes_policy() {
        let api = Arc::new(FakeApi::new(Utc::now()));
        let existing = policy("456", "4.14.0", Utc::now());
        api.add_policy(existing.clone(), PolicyState::Scheduled);
        let mutator = UpgradePolicyMutator::new(api.clone());
        mutator
            .cancel(&Target::cluster("123"), &existing)
            .await
            .unwrap();
        assert!(api.policy_ids().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_failure_names_policy() {
        let api = Arc::new(FakeApi::new(Utc::now()));
        let existing = policy("456", "4.14.0", Utc::now());
        api.add_policy(existing.clone(), PolicyState::Scheduled);
        api.fail_delete("456");
        let mutator = UpgradePolicyMutator::new(api);
        let err = mutator
            .cancel(&Target::cluster("123"), &existing)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("delete upgrade policy '456'"));
        assert!(err.to_string().contains("cluster '123'"));
    }
}
