//! Upgrade orchestration engine.
//!
//! Converges a cluster or node pool onto a desired version by reading its
//! upgrade policies, cancelling stale ones, acknowledging version gates and
//! scheduling a single manual policy.

pub mod catalog;
pub mod coordinator;
pub mod gates;
pub mod mutator;
pub mod reader;
pub mod version;

#[cfg(test)]
pub mod fake;

pub use catalog::{AvailableUpgrades, UpgradeCheck, UpgradeTargetCatalog, validate_upgrade};
pub use coordinator::{
    ReconcileOutcome, ReconcilePlan, SCHEDULE_WINDOW_MINUTES, UpgradeCoordinator, UpgradeRequest,
};
pub use gates::{GateAgreementResolver, GateCheck};
pub use mutator::UpgradePolicyMutator;
pub use reader::{DEFAULT_PAGE_SIZE, ExistingUpgrade, RemoteUpgradeReader};
pub use version::{MIN_SUPPORTED_VERSION, NumericVersion, TargetVersion};
