//! Version gate discovery and acknowledgement.
//!
//! Missing gates are discovered by submitting a dry-run policy creation: the API
//! answers with a structured error whose `details` carry the unacknowledged
//! gates. Gates flagged `sts_only` apply automatically and are never surfaced
//! to the operator nor acknowledged here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::version::TargetVersion;
use crate::error::UpgradeError;
use crate::ocm::{
    ApiErrorBody, ApiFailure, GateAgreement, NewUpgradePolicy, Target, UpgradeApi, VersionGate,
};

/// Outcome of a successful gate check.
///
/// A failed check is an `Err`, so "no gates missing" and "could not tell" can
/// never be confused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateCheck {
    /// The dry run passed; no agreements are missing.
    Clear,
    /// The dry run reported these gates as unacknowledged.
    Missing(Vec<VersionGate>),
}

/// Discovers, describes and acknowledges version gates.
#[derive(Clone)]
pub struct GateAgreementResolver {
    api: Arc<dyn UpgradeApi>,
}

impl GateAgreementResolver {
    pub fn new(api: Arc<dyn UpgradeApi>) -> Self {
        Self { api }
    }

    /// Dry-run a manual policy for `version` to discover unacknowledged gates.
    pub async fn missing_gates(
        &self,
        target: &Target,
        version: &TargetVersion,
    ) -> Result<GateCheck, UpgradeError> {
        let policy = NewUpgradePolicy::manual(version.raw_id());

        match self.api.create_policy(target, &policy, true).await {
            Ok(_) => {
                debug!("No missing gate agreements for {} to {}", target, version);
                Ok(GateCheck::Clear)
            }
            Err(ApiFailure::Api(body)) => match parse_gate_list(&body) {
                Some(gates) => {
                    debug!(
                        "{} gate agreement(s) missing for {} to {}",
                        gates.len(),
                        target,
                        version
                    );
                    Ok(GateCheck::Missing(gates))
                }
                None => Err(UpgradeError::remote(
                    "check missing gate agreements",
                    target,
                    &ApiFailure::Api(body),
                )),
            },
            Err(e) => Err(UpgradeError::remote(
                "check missing gate agreements",
                target,
                &e,
            )),
        }
    }

    /// Record an agreement for one gate. One call per gate; there is no batch endpoint.
    pub async fn acknowledge(
        &self,
        target: &Target,
        gate: &VersionGate,
    ) -> Result<GateAgreement, UpgradeError> {
        info!(
            "Acknowledging version gate {} ({}) for {}",
            gate.id, gate.label, target
        );
        self.api
            .add_gate_agreement(target.cluster_id(), &gate.id)
            .await
            .map_err(|e| {
                UpgradeError::remote(&format!("acknowledge version gate '{}'", gate.id), target, &e)
            })
    }
}

/// Parse the gate list attached to a dry-run error.
///
/// Returns `None` when the payload is not a usable gate list. A first entry
/// with an empty id marks an unrelated error document that happened to
/// deserialize; entries after the first are not checked.
pub fn parse_gate_list(body: &ApiErrorBody) -> Option<Vec<VersionGate>> {
    let details = body.details.clone()?;
    let gates: Vec<VersionGate> = match serde_json::from_value(details) {
        Ok(gates) => gates,
        Err(e) => {
            warn!("Error details are not a version gate list: {}", e);
            return None;
        }
    };

    match gates.first() {
        None => None,
        Some(first) if first.id.is_empty() => {
            warn!("Error details contain a version gate without id, ignoring gate list");
            None
        }
        Some(_) => Some(gates),
    }
}

/// Keep only gates that need explicit operator consent.
pub fn requiring_acknowledgement(gates: Vec<VersionGate>) -> Vec<VersionGate> {
    gates
        .into_iter()
        .filter(VersionGate::requires_acknowledgement)
        .collect()
}

/// Numbered, human-readable description of the gates needing consent.
pub fn describe(gates: &[VersionGate]) -> String {
    let mut text = String::from(
        "\nMissing required acknowledgements to schedule upgrade.\
         \nRead the below description and acknowledge to proceed with upgrade.\
         \nDescription:",
    );

    for (counter, gate) in gates
        .iter()
        .filter(|g| g.requires_acknowledgement())
        .enumerate()
    {
        text.push_str(&format!("\n{}) {}\n", counter + 1, gate.description));
        if !gate.warning_message.is_empty() {
            text.push_str(&format!("   Warning:     {}\n", gate.warning_message));
        }
        text.push_str(&format!("   URL:         {}\n", gate.documentation_url));
    }

    text
}

/// True if `token` consents to every gate in `gates`.
///
/// A gate without a version prefix is matched against the desired version's
/// `major.minor`.
pub fn consent_covers(token: Option<&str>, gates: &[VersionGate], desired: &TargetVersion) -> bool {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return false;
    };

    let fallback = desired.gate_prefix();
    gates.iter().all(|gate| {
        let prefix = if gate.version_raw_id_prefix.is_empty() {
            fallback.as_str()
        } else {
            gate.version_raw_id_prefix.as_str()
        };
        token == prefix
    })
}
