//! Upgrade target catalog: which versions the installed version may move to.

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tracing::{debug, info};

use super::version::{self, TargetVersion};
use crate::error::UpgradeError;
use crate::ocm::{UpgradeApi, VersionInfo};

/// Resolves the eligible upgrade targets of an installed version.
#[derive(Clone)]
pub struct UpgradeTargetCatalog {
    api: Arc<dyn UpgradeApi>,
}

impl UpgradeTargetCatalog {
    pub fn new(api: Arc<dyn UpgradeApi>) -> Self {
        Self { api }
    }

    /// Read the installed version's record and return its upgrade candidates.
    ///
    /// Nothing beyond the installed record is fetched until the returned
    /// sequence is consumed.
    pub async fn available_upgrades(
        &self,
        from_version_id: &str,
    ) -> Result<AvailableUpgrades, UpgradeError> {
        let installed = self
            .api
            .get_version(from_version_id)
            .await
            .map_err(|e| {
                UpgradeError::remote("get version", format!("version '{from_version_id}'"), &e)
            })?;

        debug!(
            "Version {} advertises {} upgrade(s)",
            installed.id,
            installed.available_upgrades.len()
        );

        Ok(AvailableUpgrades {
            api: Arc::clone(&self.api),
            installed,
        })
    }
}

/// Lazy, restartable sequence of eligible upgrade targets.
///
/// Each element costs one remote fetch; there is no batched lookup.
pub struct AvailableUpgrades {
    api: Arc<dyn UpgradeApi>,
    installed: VersionInfo,
}

impl AvailableUpgrades {
    pub const fn installed(&self) -> &VersionInfo {
        &self.installed
    }

    /// Stream the platform-enabled targets, resolving one record per element.
    pub fn stream(&self) -> impl Stream<Item = Result<VersionInfo, UpgradeError>> + '_ {
        let channel_group = self.installed.channel_group.as_deref();

        stream::iter(self.installed.available_upgrades.iter())
            .then(move |raw_id| {
                let id = version::version_id(raw_id, channel_group);
                async move {
                    self.api
                        .get_version(&id)
                        .await
                        .map_err(|e| UpgradeError::remote("get version", format!("version '{id}'"), &e))
                }
            })
            .try_filter(|record| futures::future::ready(record.rosa_enabled))
    }

    /// Drain the sequence into a vector.
    pub async fn collect(&self) -> Result<Vec<VersionInfo>, UpgradeError> {
        self.stream().try_collect().await
    }
}

/// Result of checking a requested version against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeCheck {
    /// The target already runs the requested version.
    UpToDate,
    /// The requested version is an eligible upgrade target.
    Available(VersionInfo),
}

/// Validate that `desired` is reachable from the installed version.
pub async fn validate_upgrade(
    catalog: &UpgradeTargetCatalog,
    current_version_id: &str,
    desired: &TargetVersion,
) -> Result<UpgradeCheck, UpgradeError> {
    let current = version::normalize(current_version_id)?;

    if current == *desired.version() {
        info!("Already at version {}", desired);
        return Ok(UpgradeCheck::UpToDate);
    }

    if *desired.version() < current {
        return Err(UpgradeError::UpgradeNotPossible(format!(
            "Target version {desired} is lower than current version {current} (downgrade not supported)"
        )));
    }

    let upgrades = catalog.available_upgrades(current_version_id).await?;
    let candidates = upgrades.collect().await?;

    for candidate in &candidates {
        let raw = if candidate.raw_id.is_empty() {
            &candidate.id
        } else {
            &candidate.raw_id
        };
        if desired.matches(raw)? {
            return Ok(UpgradeCheck::Available(candidate.clone()));
        }
    }

    let available: Vec<&str> = candidates.iter().map(|v| v.raw_id.as_str()).collect();
    Err(UpgradeError::UpgradeNotPossible(format!(
        "Version {desired} is not an available upgrade from {current} (available: {})",
        if available.is_empty() {
            "none".to_string()
        } else {
            available.join(", ")
        }
    )))
}
