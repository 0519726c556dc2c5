//! Upgrade coordinator: converges a target's upgrade policies onto a desired version.
//!
//! One reconciliation pass:
//! 1. list policies in scope and fetch each state,
//! 2. classify every policy (keep, cancel, or conflict) against a single clock read,
//! 3. cancel policies that must go,
//! 4. stop if a kept policy already covers the desired version,
//! 5. otherwise discover and (with consent) acknowledge missing gates,
//! 6. create a manual policy for the desired version.
//!
//! Classification runs over every policy before any mutation, so an in-flight
//! upgrade to another version aborts the pass without touching anything.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use super::gates::{self, GateAgreementResolver, GateCheck};
use super::mutator::UpgradePolicyMutator;
use super::reader::{ExistingUpgrade, RemoteUpgradeReader};
use super::version::{self, TargetVersion};
use crate::error::UpgradeError;
use crate::ocm::{PolicyState, Target, UpgradeApi, UpgradePolicy, VersionGate};

/// Pending policies for the desired version firing within this window are left alone.
pub const SCHEDULE_WINDOW_MINUTES: i64 = 10;

/// A request to converge `target` onto `desired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub target: Target,
    pub desired: TargetVersion,
    /// Operator consent to acknowledge gates for this `major.minor` (e.g. "4.14").
    pub acknowledge_for: Option<String>,
}

impl UpgradeRequest {
    pub const fn new(target: Target, desired: TargetVersion) -> Self {
        Self {
            target,
            desired,
            acknowledge_for: None,
        }
    }

    #[must_use]
    pub fn with_acknowledgement(mut self, prefix: impl Into<String>) -> Self {
        self.acknowledge_for = Some(prefix.into());
        self
    }
}

/// Read-only classification of the existing policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Policies for the desired version that already guarantee execution.
    pub keep: Vec<ExistingUpgrade>,
    /// Not-yet-started policies that must be cancelled.
    pub cancel: Vec<ExistingUpgrade>,
    ignored: usize,
}

impl ReconcilePlan {
    pub const fn is_satisfied(&self) -> bool {
        !self.keep.is_empty()
    }

    /// Policies in a terminal or unknown state, carrying no obligation.
    pub const fn ignored_count(&self) -> usize {
        self.ignored
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// An existing policy already covers the desired version; nothing was created.
    AlreadyScheduled {
        kept: Vec<ExistingUpgrade>,
        cancelled: Vec<String>,
    },
    /// A new manual policy was created.
    Scheduled {
        policy: UpgradePolicy,
        cancelled: Vec<String>,
        acknowledged: Vec<String>,
    },
}

/// Classify existing policies against the desired version at instant `now`.
///
/// Fails with [`UpgradeError::UpgradeConflict`] as soon as an executing policy
/// targets another version.
pub fn classify(
    target: &Target,
    upgrades: Vec<ExistingUpgrade>,
    desired: &TargetVersion,
    now: DateTime<Utc>,
) -> Result<ReconcilePlan, UpgradeError> {
    let deadline = now + TimeDelta::minutes(SCHEDULE_WINDOW_MINUTES);
    let mut plan = ReconcilePlan::default();

    for upgrade in upgrades {
        match upgrade.state() {
            PolicyState::Started | PolicyState::Delayed => {
                if desired.matches(upgrade.version())? {
                    debug!(
                        "Upgrade {} to {} is already {}",
                        upgrade.id(),
                        upgrade.version(),
                        upgrade.state()
                    );
                    plan.keep.push(upgrade);
                } else {
                    warn!(
                        "Upgrade {} of {} to {} is already {}, cannot move to {}",
                        upgrade.id(),
                        target,
                        upgrade.version(),
                        upgrade.state(),
                        desired
                    );
                    return Err(UpgradeError::UpgradeConflict {
                        target: target.to_string(),
                        requested: desired.to_string(),
                        in_progress: upgrade.version().to_string(),
                    });
                }
            }
            PolicyState::Pending | PolicyState::Scheduled => {
                let imminent = upgrade.next_run().is_some_and(|t| t < deadline);
                if imminent && desired.matches(upgrade.version())? {
                    debug!(
                        "Keeping upgrade {} to {}, due at {:?}",
                        upgrade.id(),
                        upgrade.version(),
                        upgrade.next_run()
                    );
                    plan.keep.push(upgrade);
                } else {
                    plan.cancel.push(upgrade);
                }
            }
            PolicyState::Completed | PolicyState::Cancelled | PolicyState::Unknown => {
                plan.ignored += 1;
            }
        }
    }

    Ok(plan)
}

/// Orchestrates reader, gate resolver and mutator into one reconciliation pass.
#[derive(Clone)]
pub struct UpgradeCoordinator {
    reader: RemoteUpgradeReader,
    gates: GateAgreementResolver,
    mutator: UpgradePolicyMutator,
}

impl UpgradeCoordinator {
    pub fn new(api: Arc<dyn UpgradeApi>, page_size: u32) -> Self {
        Self {
            reader: RemoteUpgradeReader::new(Arc::clone(&api), page_size),
            gates: GateAgreementResolver::new(Arc::clone(&api)),
            mutator: UpgradePolicyMutator::new(api),
        }
    }

    /// Read remote state and classify it without mutating anything.
    pub async fn plan(
        &self,
        target: &Target,
        desired: &TargetVersion,
        now: DateTime<Utc>,
    ) -> Result<ReconcilePlan, UpgradeError> {
        version::check_supported(desired.raw_id())?;

        let upgrades = self.reader.scheduled_upgrades(target).await?;
        let plan = classify(target, upgrades, desired, now)?;

        debug!(
            "Plan for {} to {}: {} kept, {} to cancel, {} ignored",
            target,
            desired,
            plan.keep.len(),
            plan.cancel.len(),
            plan.ignored_count()
        );
        Ok(plan)
    }

    /// Run one reconciliation pass. `now` is read once by the caller.
    pub async fn reconcile(
        &self,
        request: &UpgradeRequest,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, UpgradeError> {
        let target = &request.target;
        let desired = &request.desired;
        info!("Reconciling upgrade policies of {} to {}", target, desired);

        let plan = self.plan(target, desired, now).await?;

        let mut cancelled = Vec::with_capacity(plan.cancel.len());
        for upgrade in &plan.cancel {
            self.mutator.cancel(target, &upgrade.policy).await?;
            cancelled.push(upgrade.id().to_string());
        }

        if plan.is_satisfied() {
            info!("Upgrade of {} to {} is already scheduled", target, desired);
            return Ok(ReconcileOutcome::AlreadyScheduled {
                kept: plan.keep,
                cancelled,
            });
        }

        let acknowledged = self.resolve_gates(request).await?;
        let policy = self.mutator.create(target, desired).await?;

        Ok(ReconcileOutcome::Scheduled {
            policy,
            cancelled,
            acknowledged,
        })
    }

    /// Describe outstanding gates for `desired` without acknowledging anything.
    ///
    /// Returns `None` when no gate needs operator consent.
    pub async fn explain_gates(
        &self,
        target: &Target,
        desired: &TargetVersion,
    ) -> Result<Option<String>, UpgradeError> {
        version::check_supported(desired.raw_id())?;

        match self.gates.missing_gates(target, desired).await? {
            GateCheck::Clear => Ok(None),
            GateCheck::Missing(all) => {
                let outstanding = gates::requiring_acknowledgement(all);
                Ok((!outstanding.is_empty()).then(|| gates::describe(&outstanding)))
            }
        }
    }

    /// Acknowledge every gate needing consent, or fail if consent is missing.
    async fn resolve_gates(&self, request: &UpgradeRequest) -> Result<Vec<String>, UpgradeError> {
        let target = &request.target;
        let desired = &request.desired;

        let outstanding = match self.gates.missing_gates(target, desired).await? {
            GateCheck::Clear => return Ok(Vec::new()),
            GateCheck::Missing(all) => gates::requiring_acknowledgement(all),
        };

        if outstanding.is_empty() {
            debug!("Only automatic gates pending for {} to {}", target, desired);
            return Ok(Vec::new());
        }

        if !gates::consent_covers(request.acknowledge_for.as_deref(), &outstanding, desired) {
            return Err(acknowledgement_required(request, &outstanding));
        }

        let mut acknowledged = Vec::with_capacity(outstanding.len());
        for gate in &outstanding {
            self.gates.acknowledge(target, gate).await?;
            acknowledged.push(gate.id.clone());
        }
        Ok(acknowledged)
    }
}

fn acknowledgement_required(request: &UpgradeRequest, outstanding: &[VersionGate]) -> UpgradeError {
    let required = outstanding
        .iter()
        .map(|g| g.version_raw_id_prefix.as_str())
        .find(|p| !p.is_empty())
        .map_or_else(|| request.desired.gate_prefix(), str::to_string);

    let mut description = gates::describe(outstanding);
    if let Some(given) = request
        .acknowledge_for
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        description.push_str(&format!(
            "\nAcknowledgement was given for '{given}' but the upgrade requires '{required}'."
        ));
    }
    description.push_str(&format!(
        "\nTo acknowledge these items, re-run with acknowledgements for version '{required}'."
    ));

    UpgradeError::GateAcknowledgementRequired {
        target: request.target.to_string(),
        requested: request.desired.to_string(),
        description,
    }
}
