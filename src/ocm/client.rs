//! reqwest-backed client for the OCM clusters_mgmt API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{NewGateAgreement, PolicyWithState, VersionedResource};
use super::{
    ApiErrorBody, ApiFailure, GateAgreement, NewUpgradePolicy, PolicyPage, PolicyStateInfo,
    Target, UpgradeApi, UpgradePolicy, VersionInfo,
};
use crate::error::UpgradeError;

/// Path of the clusters_mgmt API below the gateway URL.
pub const API_ROOT: &str = "/api/clusters_mgmt/v1";

/// HTTP client for upgrade policy, version and gate agreement endpoints.
#[derive(Clone)]
pub struct OcmClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl OcmClient {
    /// Create a client for the gateway at `api_url` (e.g. `https://api.openshift.com`).
    pub fn new(api_url: &str, token: SecretString, timeout: Duration) -> Result<Self, UpgradeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ocup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpgradeError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: format!("{}{API_ROOT}", api_url.trim_end_matches('/')),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{path}", self.base_url))
            .bearer_auth(self.token.expose_secret())
    }

    /// Send a request and turn a non-2xx answer into [`ApiFailure::Api`].
    async fn execute(request: RequestBuilder) -> Result<Response, ApiFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(ApiFailure::Api(error_body(status, &text)))
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiFailure> {
        Self::execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiFailure::Decode(e.to_string()))
    }
}

/// Decode an error document, falling back to the raw body text as the reason.
fn error_body(status: StatusCode, text: &str) -> ApiErrorBody {
    let mut body = serde_json::from_str::<ApiErrorBody>(text).unwrap_or_else(|_| ApiErrorBody {
        reason: if text.trim().is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            text.trim().to_string()
        },
        ..Default::default()
    });
    body.status = status.as_u16();
    body
}

fn policies_path(target: &Target) -> String {
    format!("{}/upgrade_policies", target.path())
}

#[async_trait]
impl UpgradeApi for OcmClient {
    async fn list_policies(
        &self,
        target: &Target,
        page: u32,
        size: u32,
    ) -> Result<PolicyPage, ApiFailure> {
        debug!("Listing upgrade policies for {} (page {}, size {})", target, page, size);
        let request = self
            .request(Method::GET, &policies_path(target))
            .query(&[("page", page), ("size", size)]);
        Self::fetch(request).await
    }

    async fn get_policy_state(
        &self,
        target: &Target,
        policy_id: &str,
    ) -> Result<PolicyStateInfo, ApiFailure> {
        debug!("Getting state of upgrade policy {} for {}", policy_id, target);
        let path = format!("{}/{policy_id}", policies_path(target));
        match target {
            Target::Cluster { .. } => {
                Self::fetch(self.request(Method::GET, &format!("{path}/state"))).await
            }
            Target::NodePool { .. } => {
                let policy: PolicyWithState = Self::fetch(self.request(Method::GET, &path)).await?;
                Ok(policy.state)
            }
        }
    }

    async fn delete_policy(&self, target: &Target, policy_id: &str) -> Result<(), ApiFailure> {
        debug!("Deleting upgrade policy {} for {}", policy_id, target);
        let path = format!("{}/{policy_id}", policies_path(target));
        match Self::execute(self.request(Method::DELETE, &path)).await {
            Ok(_) => Ok(()),
            Err(ApiFailure::Api(body)) if body.status == StatusCode::NOT_FOUND.as_u16() => {
                debug!("Upgrade policy {} already gone", policy_id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_policy(
        &self,
        target: &Target,
        policy: &NewUpgradePolicy,
        dry_run: bool,
    ) -> Result<UpgradePolicy, ApiFailure> {
        debug!(
            "Creating upgrade policy to {} for {} (dry run: {})",
            policy.version, target, dry_run
        );
        let mut request = self.request(Method::POST, &policies_path(target)).json(policy);
        if dry_run {
            request = request.query(&[("dryRun", "true")]);
            Self::execute(request).await?;
            // A dry run has no persistent side effect and no meaningful body.
            return Ok(UpgradePolicy {
                cluster_id: target.cluster_id().to_string(),
                node_pool_id: target.node_pool_id().map(str::to_string),
                version: policy.version.clone(),
                schedule_type: policy.schedule_type,
                ..Default::default()
            });
        }
        Self::fetch(request).await
    }

    async fn add_gate_agreement(
        &self,
        cluster_id: &str,
        gate_id: &str,
    ) -> Result<GateAgreement, ApiFailure> {
        debug!("Adding gate agreement for gate {} on cluster {}", gate_id, cluster_id);
        let request = self
            .request(Method::POST, &format!("clusters/{cluster_id}/gate_agreements"))
            .json(&NewGateAgreement::for_gate(gate_id));
        Self::fetch(request).await
    }

    async fn get_version(&self, version_id: &str) -> Result<VersionInfo, ApiFailure> {
        debug!("Getting version {}", version_id);
        Self::fetch(self.request(Method::GET, &format!("versions/{version_id}"))).await
    }

    async fn current_version(&self, target: &Target) -> Result<String, ApiFailure> {
        debug!("Getting current version of {}", target);
        let resource: VersionedResource =
            Self::fetch(self.request(Method::GET, &target.path())).await?;

        resource
            .version
            .map(|v| if v.id.is_empty() { v.raw_id } else { v.id })
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiFailure::Decode(format!("{target} has no version")))
    }
}
