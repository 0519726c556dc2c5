//! CLI configuration and argument parsing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::UpgradeError;
use crate::ocm::Target;
use crate::upgrade::DEFAULT_PAGE_SIZE;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_DATE: &str = env!("BUILD_DATE");

pub const DEFAULT_API_URL: &str = "https://api.openshift.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable names read by the CLI.
pub mod env {
    pub const OCM_URL: &str = "OCM_URL";
    pub const OCM_TOKEN: &str = "OCM_TOKEN";
    pub const CONFIG: &str = "OCUP_CONFIG";
    pub const LOG_LEVEL: &str = "OCUP_LOG_LEVEL";
    pub const LOG_FORMAT: &str = "OCUP_LOG_FORMAT";
    pub const PAGE_SIZE: &str = "OCUP_PAGE_SIZE";
    pub const REQUEST_TIMEOUT: &str = "OCUP_REQUEST_TIMEOUT";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Upgrade policy orchestration for OpenShift managed clusters.
///
/// Converges a cluster or node pool onto one scheduled upgrade to the
/// requested version, acknowledging version gates when told to.
#[derive(Parser, Debug, Clone)]
#[command(name = "ocup")]
#[command(about = "Upgrade policy orchestration for OpenShift managed clusters")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// OCM API gateway URL
    #[arg(long, env = env::OCM_URL, global = true)]
    pub url: Option<String>,

    /// OCM access token
    #[arg(long, env = env::OCM_TOKEN, hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// YAML file with defaults for url, page size and request timeout
    #[arg(long, env = env::CONFIG, global = true)]
    pub config: Option<PathBuf>,

    /// Page size when listing upgrade policies
    #[arg(long, env = env::PAGE_SIZE, global = true)]
    pub page_size: Option<u32>,

    /// HTTP request timeout in seconds
    #[arg(long, env = env::REQUEST_TIMEOUT, global = true)]
    pub request_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = env::LOG_LEVEL, global = true)]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", env = env::LOG_FORMAT, global = true)]
    pub log_format: LogFormat,
}

/// Cluster, and optionally one of its node pools.
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Cluster ID
    #[arg(short, long)]
    pub cluster: String,

    /// Node pool ID (hosted control plane clusters)
    #[arg(short, long)]
    pub node_pool: Option<String>,
}

impl TargetArgs {
    pub fn target(&self) -> Target {
        match &self.node_pool {
            Some(np) => Target::node_pool(&self.cluster, np),
            None => Target::cluster(&self.cluster),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Schedule an upgrade, replacing stale policies
    Upgrade {
        #[command(flatten)]
        target: TargetArgs,

        /// Desired version (e.g. 4.14.1)
        #[arg(long = "version", value_name = "VERSION")]
        target_version: String,

        /// Channel group of the desired version (stable, fast, candidate, eus)
        #[arg(long)]
        channel_group: Option<String>,

        /// Acknowledge version gates for this major.minor (e.g. 4.14)
        #[arg(long, value_name = "X.Y")]
        ack_for: Option<String>,

        /// Show the reconciliation plan without changing anything
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Show version gates that must be acknowledged before upgrading
    Gates {
        #[command(flatten)]
        target: TargetArgs,

        /// Desired version (e.g. 4.14.1)
        #[arg(long = "version", value_name = "VERSION")]
        target_version: String,
    },

    /// List versions the target may upgrade to
    Versions {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List upgrade policies with their state
    Policies {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Defaults loaded from `--config`. Command line flags and env win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub page_size: Option<u32>,
    pub request_timeout: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, UpgradeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            UpgradeError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| UpgradeError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Application configuration derived from CLI args and the optional file.
#[derive(Debug, Clone)]
pub struct Config {
    pub command: Command,
    pub api_url: String,
    pub token: SecretString,
    pub page_size: u32,
    pub request_timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Create config from CLI arguments, reading `--config` if given.
    pub fn from_args(args: Args) -> Result<Self, UpgradeError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(args, file))
    }

    fn merge(args: Args, file: FileConfig) -> Self {
        Self {
            command: args.command,
            api_url: args
                .url
                .or(file.url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: SecretString::from(args.token.unwrap_or_default()),
            page_size: args
                .page_size
                .or(file.page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            request_timeout: Duration::from_secs(
                args.request_timeout
                    .or(file.request_timeout)
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            log_level: args.log_level,
            log_format: args.log_format,
        }
    }

    pub fn validate(&self) -> Result<(), UpgradeError> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(UpgradeError::InvalidConfig(format!(
                "an access token is required (--token or {})",
                env::OCM_TOKEN
            )));
        }
        if self.page_size == 0 {
            return Err(UpgradeError::InvalidConfig(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(UpgradeError::InvalidConfig(
                "request timeout must be at least 1 second".to_string(),
            ));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(UpgradeError::InvalidConfig(format!(
                "API URL must start with http:// or https://: {}",
                self.api_url
            )));
        }
        Ok(())
    }
}
