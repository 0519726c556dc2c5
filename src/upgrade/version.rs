//! Version normalization and comparison.
//!
//! Remote version ids carry product decoration (`openshift-v4.14.1`) and, off the
//! stable track, a channel-group suffix (`openshift-v4.14.0-rc.1-candidate`).
//! Both are stripped before the remainder is parsed as a semantic version.

use std::cmp::Ordering;

use semver::{BuildMetadata, Version};

use crate::error::UpgradeError;

/// Product decoration in front of every version id.
pub const VERSION_PREFIX: &str = "openshift-v";

/// Oldest version this engine will schedule upgrades to.
pub const MIN_SUPPORTED_VERSION: &str = "4.10";

/// Channel group whose version ids carry no suffix.
pub const DEFAULT_CHANNEL_GROUP: &str = "stable";

/// Known release tracks that may appear as a version id suffix.
const CHANNEL_GROUPS: &[&str] = &["stable", "fast", "candidate", "nightly", "eus"];

/// A normalized, comparable version.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumericVersion(Version);

impl NumericVersion {
    /// The `major.minor` prefix that version gates and acknowledgements refer to.
    pub fn gate_prefix(&self) -> String {
        format!("{}.{}", self.0.major, self.0.minor)
    }
}

impl std::fmt::Display for NumericVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strip product prefix and channel-group suffix, leaving the raw version id.
pub fn raw_version_id(raw: &str) -> &str {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix(VERSION_PREFIX).unwrap_or(trimmed);
    CHANNEL_GROUPS
        .iter()
        .find_map(|group| {
            stripped
                .strip_suffix(group)
                .and_then(|rest| rest.strip_suffix('-'))
        })
        .unwrap_or(stripped)
}

/// Normalize a decorated version id into a comparable version.
pub fn normalize(raw: &str) -> Result<NumericVersion, UpgradeError> {
    let id = raw_version_id(raw);

    // Two-component versions ("4.10") are accepted as "4.10.0".
    let (core, rest) = id.find(['-', '+']).map_or((id, ""), |pos| id.split_at(pos));
    let padded = if core.split('.').count() == 2 {
        format!("{core}.0{rest}")
    } else {
        id.to_string()
    };

    let mut version =
        Version::parse(&padded).map_err(|_| UpgradeError::InvalidVersionFormat(raw.to_string()))?;
    version.build = BuildMetadata::EMPTY;
    Ok(NumericVersion(version))
}

/// Compare two decorated version ids by semantic-version ordering.
pub fn compare(a: &str, b: &str) -> Result<Ordering, UpgradeError> {
    Ok(normalize(a)?.cmp(&normalize(b)?))
}

/// Fail with [`UpgradeError::UnsupportedVersion`] if the version is below the floor.
pub fn check_supported(raw: &str) -> Result<NumericVersion, UpgradeError> {
    let version = normalize(raw)?;
    let minimum = normalize(MIN_SUPPORTED_VERSION)?;
    if version < minimum {
        return Err(UpgradeError::UnsupportedVersion {
            requested: raw.to_string(),
            minimum: MIN_SUPPORTED_VERSION.to_string(),
        });
    }
    Ok(version)
}

/// Build the lookup id of a version from its raw id and channel group.
pub fn version_id(raw_id: &str, channel_group: Option<&str>) -> String {
    match channel_group {
        Some(group) if !group.is_empty() && group != DEFAULT_CHANNEL_GROUP => {
            format!("{VERSION_PREFIX}{raw_id}-{group}")
        }
        _ => format!("{VERSION_PREFIX}{raw_id}"),
    }
}

/// The version a caller wants a target to converge on.
///
/// Equality ignores the channel group: two targets are equal iff their
/// normalized versions are equal.
#[derive(Clone, Debug)]
pub struct TargetVersion {
    raw_id: String,
    version: NumericVersion,
    channel_group: Option<String>,
}

impl TargetVersion {
    pub fn parse(raw: &str, channel_group: Option<&str>) -> Result<Self, UpgradeError> {
        let version = normalize(raw)?;
        Ok(Self {
            raw_id: raw_version_id(raw).to_string(),
            version,
            channel_group: channel_group
                .filter(|g| !g.is_empty())
                .map(str::to_string),
        })
    }

    /// Raw id sent in policy bodies (e.g. "4.14.1").
    pub fn raw_id(&self) -> &str {
        &self.raw_id
    }

    pub const fn version(&self) -> &NumericVersion {
        &self.version
    }

    pub fn channel_group(&self) -> Option<&str> {
        self.channel_group.as_deref()
    }

    /// Lookup id in the version catalog.
    pub fn version_id(&self) -> String {
        version_id(&self.raw_id, self.channel_group())
    }

    pub fn gate_prefix(&self) -> String {
        self.version.gate_prefix()
    }

    /// True if a decorated version id names this same version.
    pub fn matches(&self, raw: &str) -> Result<bool, UpgradeError> {
        Ok(normalize(raw)? == self.version)
    }
}

impl PartialEq for TargetVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for TargetVersion {}

impl std::fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw_id)
    }
}
