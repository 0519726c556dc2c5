//! ocup - upgrade policy orchestration for OpenShift managed clusters.
//!
//! Drives the clusters_mgmt API so that a cluster or node pool ends up with
//! exactly one upgrade scheduled to the requested version:
//! - Cancels not-yet-started policies for other versions
//! - Refuses to interfere with an upgrade already in flight
//! - Discovers and acknowledges version gates with operator consent

pub mod config;
pub mod error;
pub mod ocm;
pub mod output;
pub mod upgrade;

pub use error::UpgradeError;
