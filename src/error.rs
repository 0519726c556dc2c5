//! Custom error types for ocup.

use std::fmt::Display;

use thiserror::Error;

use crate::ocm::ApiFailure;

/// Errors that can occur while reconciling upgrade policies.
#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("Invalid version format: {0}")]
    InvalidVersionFormat(String),

    #[error("Version {requested} is not supported (minimum supported version: {minimum})")]
    UnsupportedVersion { requested: String, minimum: String },

    #[error("Upgrade not possible: {0}")]
    UpgradeNotPossible(String),

    #[error(
        "Cannot upgrade {target} to {requested}: a cluster upgrade to {in_progress} is already in progress"
    )]
    UpgradeConflict {
        target: String,
        requested: String,
        in_progress: String,
    },

    #[error("Cannot upgrade {target} to {requested}: {description}")]
    GateAcknowledgementRequired {
        target: String,
        requested: String,
        description: String,
    },

    #[error("[{operation}] {target}: {message}")]
    Remote {
        operation: String,
        target: String,
        message: String,
        transient: bool,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl UpgradeError {
    /// Wrap a remote API failure with the operation name and the target it was issued for.
    pub fn remote(operation: &str, target: impl Display, failure: &ApiFailure) -> Self {
        Self::Remote {
            operation: operation.to_string(),
            target: target.to_string(),
            message: failure.to_string(),
            transient: failure.is_transient(),
        }
    }

    /// Returns true if this error is transient and the caller may retry.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Remote {
                transient: true,
                ..
            }
        )
    }
}
